//! Detail texture settings that sit beside the primitive hierarchy.

use crate::config_tree::ConfigNode;

/// A detail image and the scalars that shape how it is blended in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SplatDetailData {
    pub image: Option<String>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub threshold: Option<f32>,
    pub slope: Option<f32>,
    pub(crate) texture_index: Option<u32>,
}

impl SplatDetailData {
    pub fn from_config(conf: &ConfigNode) -> Self {
        Self {
            image: conf.child_value("image").map(str::to_string),
            brightness: conf.get("brightness"),
            contrast: conf.get("contrast"),
            threshold: conf.get("threshold"),
            slope: conf.get("slope"),
            texture_index: None,
        }
    }

    pub fn to_config(&self) -> ConfigNode {
        let mut conf = ConfigNode::new("detail");
        conf.set_opt("image", self.image.as_deref());
        conf.set_opt("brightness", self.brightness);
        conf.set_opt("contrast", self.contrast);
        conf.set_opt("threshold", self.threshold);
        conf.set_opt("slope", self.slope);
        conf
    }

    pub fn texture_index(&self) -> Option<u32> {
        self.texture_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_round_trip() {
        let detail = SplatDetailData {
            image: Some("detail/noise.png".into()),
            brightness: Some(1.25),
            contrast: Some(0.5),
            threshold: None,
            slope: Some(0.75),
            texture_index: None,
        };
        let conf = detail.to_config();
        assert_eq!(conf.child_value("threshold"), None);
        assert_eq!(SplatDetailData::from_config(&conf), detail);
    }

    #[test]
    fn test_detail_starts_without_texture_index() {
        let mut conf = ConfigNode::new("detail");
        conf.set("image", "noise.png");
        let detail = SplatDetailData::from_config(&conf);
        assert_eq!(detail.texture_index(), None);
        assert_eq!(detail.brightness, None);
    }
}

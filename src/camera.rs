use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A fixed capture device mounted on the vehicle.
///
/// Declaration order is the canonical camera order: features are emitted in
/// it and sibling cameras are searched in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Camera {
    Front,
    Back,
    Left,
    Right,
}

impl Camera {
    pub const ALL: [Camera; 4] = [Camera::Front, Camera::Back, Camera::Left, Camera::Right];

    pub fn as_str(self) -> &'static str {
        match self {
            Camera::Front => "front",
            Camera::Back => "back",
            Camera::Left => "left",
            Camera::Right => "right",
        }
    }

    /// Compass-style bearing used for map rendering. Not derived from motion.
    pub fn bearing(self) -> u16 {
        match self {
            Camera::Front => 0,
            Camera::Right => 90,
            Camera::Back => 180,
            Camera::Left => 270,
        }
    }

    /// Parses a camera folder name. `rear` is an alias of `back`.
    pub fn from_folder_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "front" => Some(Camera::Front),
            "back" | "rear" => Some(Camera::Back),
            "left" => Some(Camera::Left),
            "right" => Some(Camera::Right),
            _ => None,
        }
    }

    pub fn from_folder(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_folder_name)
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_names_are_case_insensitive() {
        assert_eq!(Camera::from_folder_name("FRONT"), Some(Camera::Front));
        assert_eq!(Camera::from_folder_name("Left"), Some(Camera::Left));
        assert_eq!(Camera::from_folder_name("sequence0"), None);
    }

    #[test]
    fn rear_is_back() {
        assert_eq!(Camera::from_folder_name("rear"), Some(Camera::Back));
        assert_eq!(
            Camera::from_folder(Path::new("/data/run1/Rear")),
            Some(Camera::Back)
        );
    }

    #[test]
    fn bearings_are_fixed() {
        let bearings: Vec<u16> = Camera::ALL.iter().map(|c| c.bearing()).collect();
        assert_eq!(bearings, vec![0, 180, 270, 90]);
    }
}

use std::collections::BTreeSet;

use crate::config::{ChannelConfig, ChannelPolicy};

use super::model::{ChannelImage, Scene};

// ---------------------------------------------------------------------------
// Channel selection: which scenes of a container become viewer layers
// ---------------------------------------------------------------------------

/// Keep the scenes whose channel name the config knows, in file order.
///
/// A scene passes when:
/// * its last path segment is a configured channel name (exact match) → kept
/// * anything else → skipped, never an error
///
/// Layer names are unique within the result: a repeated channel name gets a
/// ` [n]` suffix (`STAR RED`, `STAR RED [1]`, ...), so every layer has its own
/// export file and limits entry.
pub fn select_channels(scenes: Vec<Scene>, config: &ChannelConfig) -> Vec<ChannelImage> {
    let mut taken = BTreeSet::new();
    scenes
        .into_iter()
        .filter_map(|scene| match config.policy(scene.channel_name()) {
            ChannelPolicy::Keep(settings) => {
                let channel = unique_name(scene.channel_name(), &mut taken);
                log::debug!("Layer '{channel}' from group '{}'", scene.group());
                Some(ChannelImage {
                    channel,
                    settings: *settings,
                    scene: scene.path,
                    data: scene.data,
                })
            }
            ChannelPolicy::Skip => {
                log::debug!(
                    "Skipping '{}' in group '{}' (channel not configured)",
                    scene.channel_name(),
                    scene.group()
                );
                None
            }
        })
        .collect()
}

fn unique_name(base: &str, taken: &mut BTreeSet<String>) -> String {
    let mut name = base.to_string();
    let mut n = 0;
    while taken.contains(&name) {
        n += 1;
        name = format!("{base} [{n}]");
    }
    taken.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use ndarray::Array3;

    use super::*;

    fn scene(path: &str) -> Scene {
        Scene {
            path: path.to_string(),
            data: Array3::zeros((1, 2, 2)),
        }
    }

    #[test]
    fn keeps_configured_channels_in_order() {
        let scenes = vec![
            scene("Overview/STAR GREEN"),
            scene("Overview/Transmitted"),
            scene("Overview/STAR RED"),
        ];
        let kept = select_channels(scenes, &ChannelConfig::default());

        let names: Vec<&str> = kept.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(names, vec!["STAR GREEN", "STAR RED"]);
        assert_eq!(kept[1].scene, "Overview/STAR RED");
        assert_eq!(kept[1].settings.sigma, 1.0);
    }

    #[test]
    fn repeated_channels_get_numbered_names() {
        let scenes = vec![
            scene("Field 1/STAR RED"),
            scene("Field 2/STAR RED"),
            scene("Field 2/STAR GREEN"),
            scene("Field 3/STAR RED"),
        ];
        let kept = select_channels(scenes, &ChannelConfig::default());

        let names: Vec<&str> = kept.iter().map(|c| c.channel.as_str()).collect();
        assert_eq!(names, vec!["STAR RED", "STAR RED [1]", "STAR GREEN", "STAR RED [2]"]);
        assert_eq!(kept[3].scene, "Field 3/STAR RED");
    }

    #[test]
    fn nothing_recognised_yields_empty() {
        let kept = select_channels(vec![scene("a/DAPI"), scene("STAR RED/raw")], &ChannelConfig::default());
        assert!(kept.is_empty());
    }
}

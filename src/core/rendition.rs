//! Rendition normalization: raw stream list to ranked user-facing options

use crate::core::media_info::RawStreamDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator the inspector uses inside ids of virtual merged formats
pub const MERGE_MARKER: char = '+';

/// Container required for a stream to count as progressive
const PROGRESSIVE_CONTAINER: &str = "mp4";

/// One selectable quality option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenditionOption {
    /// Label such as "1080p"
    pub resolution_label: String,
    /// Numeric height behind the label
    pub height: u32,
    /// Inspector format id this option came from
    pub format_id: String,
    /// Total bitrate, used for ranking only
    pub bitrate: f64,
    /// True when one stream carries audio and video
    pub is_progressive: bool,
}

impl RenditionOption {
    fn from_descriptor(descriptor: &RawStreamDescriptor, height: u32, progressive: bool) -> Self {
        Self {
            resolution_label: format!("{}p", height),
            height,
            format_id: descriptor.format_id.clone(),
            bitrate: descriptor.total_bitrate.unwrap_or(0.0),
            is_progressive: progressive,
        }
    }
}

/// Result of normalizing a stream list
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Renditions {
    /// Options sorted by resolution, highest first
    pub options: Vec<RenditionOption>,
    /// Whether an audio-only stream exists
    pub audio_available: bool,
}

/// Best option per resolution, remembering first-seen order
#[derive(Default)]
struct Bucket {
    entries: Vec<RenditionOption>,
    index: HashMap<u32, usize>,
}

impl Bucket {
    fn offer(&mut self, candidate: RenditionOption) {
        match self.index.get(&candidate.height) {
            Some(&slot) => {
                // Strictly greater only, so the first of equal bitrates stays.
                if candidate.bitrate > self.entries[slot].bitrate {
                    self.entries[slot] = candidate;
                }
            }
            None => {
                self.index.insert(candidate.height, self.entries.len());
                self.entries.push(candidate);
            }
        }
    }
}

/// Normalize raw descriptors into deduplicated, ranked options
pub fn normalize(raw: &[RawStreamDescriptor]) -> Renditions {
    let audio_available = best_audio(raw).is_some();

    let mut progressive = Bucket::default();
    let mut separate = Bucket::default();

    for descriptor in raw {
        let Some(height) = descriptor.positive_height() else {
            continue;
        };

        if is_progressive(descriptor) {
            progressive.offer(RenditionOption::from_descriptor(descriptor, height, true));
        } else if descriptor.is_video_only() {
            separate.offer(RenditionOption::from_descriptor(descriptor, height, false));
        }
    }

    let Bucket {
        entries: mut options,
        index: progressive_heights,
    } = progressive;
    options.extend(
        separate
            .entries
            .into_iter()
            .filter(|option| !progressive_heights.contains_key(&option.height)),
    );
    options.sort_by(|a, b| b.height.cmp(&a.height));

    Renditions {
        options,
        audio_available,
    }
}

/// Highest audio-bitrate audio-only stream.
///
/// Only its existence is reported outward; fetches pick their own audio.
fn best_audio(raw: &[RawStreamDescriptor]) -> Option<&RawStreamDescriptor> {
    let mut best: Option<(&RawStreamDescriptor, f64)> = None;
    for descriptor in raw.iter().filter(|d| d.is_audio_only()) {
        let abr = descriptor.audio_bitrate.unwrap_or(0.0);
        match best {
            Some((_, current)) if abr <= current => {}
            _ => best = Some((descriptor, abr)),
        }
    }
    best.map(|(descriptor, _)| descriptor)
}

fn is_progressive(descriptor: &RawStreamDescriptor) -> bool {
    descriptor.container_ext == PROGRESSIVE_CONTAINER
        && descriptor.has_video()
        && descriptor.has_audio()
        && !descriptor.format_id.contains(MERGE_MARKER)
}

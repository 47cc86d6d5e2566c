//! Sample-format negotiation: classifying, coercing, and MIME-labelling the
//! triple of (sample format, rate, channel map) that a source exposes.
//!
//! A source's native format is rarely one a browser's `<audio>` element can
//! play directly. This module answers three questions: is a given format
//! already playable over HTTP (`is_encodable`), if not what's the nearest
//! playable neighbour (`coerce`), and what MIME type describes a playable
//! format (`to_mime`).

use serde::{Deserialize, Serialize};

/// The set of sample encodings the core can hand us. Only a subset of these
/// are directly MIME-encodable; [`coerce`] maps the rest onto one that is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    U8,
    ALaw,
    ULaw,
    S16LE,
    S16BE,
    S24LE,
    S24BE,
    S24_32LE,
    S24_32BE,
    S32LE,
    S32BE,
    F32LE,
    F32BE,
}

impl SampleFormat {
    /// Size in bytes of a single sample in this format.
    pub fn sample_size(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::ALaw | SampleFormat::ULaw => 1,
            SampleFormat::S16LE | SampleFormat::S16BE => 2,
            SampleFormat::S24LE | SampleFormat::S24BE => 3,
            SampleFormat::S24_32LE
            | SampleFormat::S24_32BE
            | SampleFormat::S32LE
            | SampleFormat::S32BE
            | SampleFormat::F32LE
            | SampleFormat::F32BE => 4,
        }
    }
}

/// A channel's speaker position. Only the positions the negotiator ever
/// produces or checks are modelled; everything else coerces away before it
/// reaches this type's callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPosition {
    Mono,
    Left,
    Right,
    Other,
}

/// Per-channel speaker layout, parallel to [`SampleSpec::channels`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub positions: Vec<ChannelPosition>,
}

impl ChannelMap {
    /// The default layout the core assigns for a given channel count: mono
    /// gets `Mono`, stereo gets `Left, Right`. Anything else is left as
    /// `Other` placeholders and will not survive [`is_encodable`].
    pub fn default_for(channels: u8) -> Self {
        let positions = match channels {
            1 => vec![ChannelPosition::Mono],
            2 => vec![ChannelPosition::Left, ChannelPosition::Right],
            n => vec![ChannelPosition::Other; n as usize],
        };
        ChannelMap { positions }
    }
}

/// A source's (format, rate, channel count) triple, the unit the negotiator
/// operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u8,
}

impl SampleSpec {
    /// Bytes occupied by one frame (one sample per channel).
    pub fn frame_size(&self) -> usize {
        self.format.sample_size() * self.channels as usize
    }

    /// Bytes per second of uncompressed audio at this spec.
    pub fn bytes_per_second(&self) -> u64 {
        self.frame_size() as u64 * self.rate as u64
    }
}

const ALLOWED_RATES: [u32; 8] = [8000, 11025, 16000, 22050, 24000, 32000, 44100, 48000];

/// True iff `(spec, map)` is already one of the MIME-representable forms:
/// `S16BE | S24BE | U8` at an allowed rate with mono or stereo, laid out as
/// `Mono` or `Left, Right`; or `ULaw` at 8000 Hz mono.
pub fn is_encodable(spec: &SampleSpec, map: &ChannelMap) -> bool {
    match spec.format {
        SampleFormat::S16BE | SampleFormat::S24BE | SampleFormat::U8 => {
            if !ALLOWED_RATES.contains(&spec.rate) {
                return false;
            }
            if spec.channels != 1 && spec.channels != 2 {
                return false;
            }
            match map.positions.as_slice() {
                [ChannelPosition::Mono] if spec.channels == 1 => true,
                [ChannelPosition::Left, ChannelPosition::Right] if spec.channels == 2 => true,
                _ => false,
            }
        }
        SampleFormat::ULaw => {
            spec.rate == 8000
                && spec.channels == 1
                && matches!(map.positions.as_slice(), [ChannelPosition::Mono])
        }
        _ => false,
    }
}

/// Mutates `spec`/`map` in place toward the nearest encodable neighbour.
/// This is a coercion ladder, not a round-to-nearest function: 11025 maps
/// up to 16000, not down to 8000 or up to 22050.
///
/// Post-condition: `is_encodable(spec, map)` holds afterwards.
pub fn coerce(spec: &mut SampleSpec, map: &mut ChannelMap) {
    if spec.channels > 2 {
        spec.channels = 2;
    }

    spec.rate = if spec.rate > 44100 {
        48000
    } else if spec.rate > 32000 {
        44100
    } else if spec.rate > 24000 {
        32000
    } else if spec.rate > 22050 {
        24000
    } else if spec.rate > 16000 {
        22050
    } else if spec.rate > 11025 {
        16000
    } else if spec.rate > 8000 {
        11025
    } else {
        8000
    };

    spec.format = match spec.format {
        SampleFormat::S24BE
        | SampleFormat::S24LE
        | SampleFormat::S24_32LE
        | SampleFormat::S24_32BE
        | SampleFormat::S32LE
        | SampleFormat::S32BE
        | SampleFormat::F32LE
        | SampleFormat::F32BE => SampleFormat::S24BE,

        SampleFormat::S16BE | SampleFormat::S16LE => SampleFormat::S16BE,

        SampleFormat::ULaw | SampleFormat::ALaw => {
            if spec.rate == 8000 && spec.channels == 1 {
                SampleFormat::ULaw
            } else {
                SampleFormat::S16BE
            }
        }

        SampleFormat::U8 => SampleFormat::U8,
    };

    *map = ChannelMap::default_for(spec.channels);

    debug_assert!(is_encodable(spec, map));
}

/// Renders an encodable spec as the MIME type a browser can play. Returns
/// `None` if `spec`/`map` is not encodable; callers always [`coerce`] first,
/// so in practice this never happens.
pub fn to_mime(spec: &SampleSpec, map: &ChannelMap) -> Option<String> {
    if !is_encodable(spec, map) {
        return None;
    }

    Some(match spec.format {
        SampleFormat::S16BE => format!("audio/L16; rate={}; channels={}", spec.rate, spec.channels),
        SampleFormat::S24BE => format!("audio/L24; rate={}; channels={}", spec.rate, spec.channels),
        SampleFormat::U8 => format!("audio/L8; rate={}; channels={}", spec.rate, spec.channels),
        SampleFormat::ULaw => "audio/basic".to_string(),
        _ => unreachable!("coerce() never leaves a non-encodable format behind"),
    })
}

/// Coerces a copy of `spec`/`map` and renders its MIME type in one step —
/// the combination the info handlers use to label sink/source links.
pub fn coerce_and_mime(spec: &SampleSpec, map: &ChannelMap) -> String {
    let mut spec = spec.clone();
    let mut map = map.clone();
    coerce(&mut spec, &mut map);
    to_mime(&spec, &map).expect("coerce() always yields an encodable spec")
}

/// Converts a byte count resident in a queue into microseconds of playback
/// time at `spec`'s rate — used for latency reporting.
pub fn bytes_to_usec(bytes: usize, spec: &SampleSpec) -> u64 {
    let bps = spec.bytes_per_second();
    if bps == 0 {
        return 0;
    }
    (bytes as u64 * 1_000_000) / bps
}

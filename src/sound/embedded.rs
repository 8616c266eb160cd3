//! Voice clips compiled into the binary.
//!
//! The bundled set covers the fixed vocabulary and `num0` through `num60`,
//! all 16-bit mono PCM at 8 kHz. It is the fallback behind the configured
//! voice directory, so a fresh install can announce without any setup.
//! Ambient `messageNNN` clips are not bundled.

use std::borrow::Cow;

use super::source::AssetStore;

macro_rules! voice_table {
    ($($name:literal),* $(,)?) => {
        &[$(
            (
                $name,
                include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/voice/", $name, ".wav"))
                    as &[u8],
            ),
        )*]
    };
}

/// Bundled clips by name.
pub const EMBEDDED_CLIPS: &[(&str, &[u8])] = voice_table![
    "round", "of", "workfor", "restfor", "minutes", "youhave", "minutesleft", "towork", "torest",
    "done", "num0", "num1", "num2", "num3", "num4", "num5", "num6", "num7", "num8", "num9",
    "num10", "num11", "num12", "num13", "num14", "num15", "num16", "num17", "num18", "num19",
    "num20", "num21", "num22", "num23", "num24", "num25", "num26", "num27", "num28", "num29",
    "num30", "num31", "num32", "num33", "num34", "num35", "num36", "num37", "num38", "num39",
    "num40", "num41", "num42", "num43", "num44", "num45", "num46", "num47", "num48", "num49",
    "num50", "num51", "num52", "num53", "num54", "num55", "num56", "num57", "num58", "num59",
    "num60",
];

/// Returns the bundled clip called `name`.
#[must_use]
pub fn get_embedded_clip(name: &str) -> Option<&'static [u8]> {
    EMBEDDED_CLIPS
        .iter()
        .find(|(clip, _)| *clip == name)
        .map(|(_, bytes)| *bytes)
}

/// `AssetStore` over the bundled clips.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedAssets;

impl AssetStore for EmbeddedAssets {
    fn lookup(&self, name: &str) -> Option<Cow<'_, [u8]>> {
        get_embedded_clip(name).map(Cow::Borrowed)
    }
}

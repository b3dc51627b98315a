//! Hardware capability tests for machines with a real audio output.
//!
//! These verify that rodio can open the default device and that a bad
//! device name falls back to the default instead of failing the clip.
//! They are non-deterministic by nature and stay out of normal CI runs.

#[cfg(test)]
mod hardware_tests {
    use voxdub_playback::{AudioOutput, RodioOutput};

    /// Minimal 16-bit mono PCM WAV of silence.
    fn silent_wav(millis: u32) -> Vec<u8> {
        let sample_rate: u32 = 8000;
        let samples = sample_rate * millis / 1000;
        let data_len = samples * 2;
        let mut wav = Vec::with_capacity(44 + data_len as usize);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(44 + data_len as usize, 0);
        wav
    }

    #[tokio::test]
    #[ignore = "Requires real audio hardware"]
    async fn default_device_plays_a_short_clip() {
        if std::env::var("VOXDUB_E2E_REAL_AUDIO").is_err() {
            println!("Skipping audio hardware test: VOXDUB_E2E_REAL_AUDIO not set");
            return;
        }

        let output = RodioOutput::spawn().unwrap();
        output.play(&silent_wav(50), None).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires real audio hardware"]
    async fn unknown_device_falls_back_to_default() {
        if std::env::var("VOXDUB_E2E_REAL_AUDIO").is_err() {
            println!("Skipping audio hardware test: VOXDUB_E2E_REAL_AUDIO not set");
            return;
        }

        let output = RodioOutput::spawn().unwrap();
        output
            .play(&silent_wav(50), Some("voxdub-no-such-device"))
            .await
            .unwrap();
    }
}

use std::io::Cursor;

use anyhow::Result;
use base64::Engine;

/// Raw little-endian f32 bytes for one frame, the streaming wire format.
pub fn frame_to_le_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// Mono 16-bit PCM WAV container for whole-waveform responses.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(v)
            .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
    }
    writer
        .finalize()
        .map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;

    Ok(cursor.into_inner())
}

/// WAV bytes as base64, for JSON responses.
pub fn encode_wav_base64(samples: &[f32], sample_rate: u32) -> Result<String> {
    let bytes = encode_wav(samples, sample_rate)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le_bytes_round_trip() {
        let samples = [0.0f32, 0.5, -1.0, 1.0];
        let bytes = frame_to_le_bytes(&samples);
        assert_eq!(bytes.len(), samples.len() * 4);
        for (i, s) in samples.iter().enumerate() {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            assert_eq!(f32::from_le_bytes(buf), *s);
        }
    }

    #[test]
    fn wav_has_riff_header_and_pcm_payload() {
        let samples = vec![0.0f32; 256];
        let bytes = encode_wav(&samples, 22_050).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let bytes = encode_wav(&[2.0, -2.0], 22_050).unwrap();
        let hi = i16::from_le_bytes([bytes[44], bytes[45]]);
        let lo = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(hi, i16::MAX);
        assert_eq!(lo, -i16::MAX);
    }

    #[test]
    fn base64_is_decodable() {
        let encoded = encode_wav_base64(&[0.25f32; 16], 16_000).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(&decoded[0..4], b"RIFF");
    }
}

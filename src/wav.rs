use tracing::debug;

use crate::model::AudioBuffer;

/// Size of the canonical RIFF/WAVE header written by [`encode_wav`].
pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * BITS_PER_SAMPLE / 8;

/// Highest rate whose byte rate still fits the header's 32-bit field.
pub const MAX_SAMPLE_RATE: u32 = u32::MAX / BLOCK_ALIGN as u32;

/// Encode float PCM samples into a mono 16-bit linear PCM WAVE file.
///
/// The output is always exactly `44 + 2 * samples.len()` bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * BLOCK_ALIGN as usize) as u32;
    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&CHANNELS.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.saturating_mul(BLOCK_ALIGN as u32).to_le_bytes());
    bytes.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for &sample in samples {
        bytes.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    debug!("Encoded {} samples at {} Hz into {} bytes", samples.len(), sample_rate, bytes.len());
    bytes
}

/// Encode an [`AudioBuffer`] produced by the synthesizer.
pub fn encode_buffer(buffer: &AudioBuffer) -> Vec<u8> {
    encode_wav(buffer.samples(), buffer.sample_rate())
}

/// Clamp to [-1, 1], then scale negatives by 32768 and the rest by 32767 so +1.0 cannot overflow.
fn quantize(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

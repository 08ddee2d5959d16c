// Tests for the PCM16 helpers
//
// The reply audio travels as little-endian 16-bit PCM from synthesis to
// the kiosk speaker, so the byte conversions must be exact: no lossy
// step is allowed anywhere in the decode path.

use anyhow::Result;
use kiosk_voice::audio::{pcm16_from_bytes, pcm16_to_bytes, pcm16_to_f32, wrap_pcm_in_wav};
use std::io::Cursor;

#[test]
fn test_pcm16_round_trip_is_exact() {
    let samples: Vec<i16> = vec![0, 1, -1, 8_192, -8_192, i16::MAX, i16::MIN, 12_345];

    let bytes = pcm16_to_bytes(&samples);
    assert_eq!(bytes.len(), samples.len() * 2);
    assert_eq!(pcm16_from_bytes(&bytes), samples);
}

#[test]
fn test_pcm16_bytes_are_little_endian() {
    assert_eq!(pcm16_to_bytes(&[0x0102]), vec![0x02, 0x01]);
    assert_eq!(pcm16_from_bytes(&[0x02, 0x01]), vec![0x0102]);
}

#[test]
fn test_trailing_odd_byte_is_dropped() {
    let bytes = [0x00, 0x01, 0xFF];
    assert_eq!(pcm16_from_bytes(&bytes), vec![0x0100]);
}

#[test]
fn test_f32_normalization_range() {
    let floats = pcm16_to_f32(&[0, 16_384, -16_384, i16::MIN]);
    assert_eq!(floats, vec![0.0, 0.5, -0.5, -1.0]);

    // The positive extreme lands just under 1.0
    let max = pcm16_to_f32(&[i16::MAX])[0];
    assert!(max > 0.999 && max < 1.0);
}

#[test]
fn test_wrap_pcm_in_wav_round_trips_through_hound() -> Result<()> {
    let samples: Vec<i16> = vec![0, 100, -100, 32_000, -32_000];
    let wav = wrap_pcm_in_wav(&pcm16_to_bytes(&samples), 16_000)?;

    let mut reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.bits_per_sample, 16);

    let decoded: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(decoded, samples);

    Ok(())
}

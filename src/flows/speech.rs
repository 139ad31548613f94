//! Speech flows: transcription from a base64 audio data URI and
//! synthesis back to one, with the PCM-to-WAV wrapping done locally.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::backend::GenerativeBackend;
use crate::error::{MemoWeaveError, Result};

/// Synthesis output format: 24 kHz 16-bit mono PCM.
const SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Turn a `data:audio/...;base64,...` URI into text.
pub async fn transcribe(backend: &dyn GenerativeBackend, uri: &str) -> Result<String> {
    let (mime, audio) = parse_data_uri(uri)?;
    if !mime.starts_with("audio/") {
        return Err(MemoWeaveError::DataUri(format!(
            "expected an audio payload, got {}",
            mime
        )));
    }
    if audio.is_empty() {
        return Err(MemoWeaveError::DataUri("empty audio payload".to_string()));
    }
    backend.transcribe(audio, &mime).await
}

/// Speak `text`, returning the audio as a `data:audio/wav;base64,...`
/// URI ready for playback.
pub async fn speak(backend: &dyn GenerativeBackend, text: &str, voice: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(MemoWeaveError::invalid("text", "(empty)"));
    }
    let pcm = backend.synthesize(text, voice).await?;
    let wav = wrap_pcm_in_wav(&pcm);
    Ok(format!("data:audio/wav;base64,{}", BASE64.encode(wav)))
}

/// Split a base64 data URI into its media type and decoded bytes.
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| MemoWeaveError::DataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| MemoWeaveError::DataUri("missing payload separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| MemoWeaveError::DataUri("payload must be base64".to_string()))?;
    if mime.is_empty() {
        return Err(MemoWeaveError::DataUri("missing media type".to_string()));
    }
    let bytes = BASE64.decode(payload.trim())?;
    Ok((mime.to_string(), bytes))
}

/// Prefix raw PCM samples with the 44-byte RIFF/WAV header.
pub fn wrap_pcm_in_wav(pcm: &[u8]) -> Vec<u8> {
    let byte_rate = SAMPLE_RATE * u32::from(CHANNELS) * u32::from(BITS_PER_SAMPLE) / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::testing::ScriptedBackend;

    #[test]
    fn test_wav_header_layout() {
        let pcm = vec![0u8; 100];
        let wav = wrap_pcm_in_wav(&pcm);

        assert_eq!(wav.len(), 144);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 136);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        // Mono 16-bit at 24 kHz.
        assert_eq!(u16::from_le_bytes(wav[22..24].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 24_000);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 48_000);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 100);
    }

    #[test]
    fn test_parse_data_uri_roundtrip() {
        let uri = format!("data:audio/webm;base64,{}", BASE64.encode(b"chunk"));
        let (mime, bytes) = parse_data_uri(&uri).unwrap();
        assert_eq!(mime, "audio/webm");
        assert_eq!(bytes, b"chunk");
    }

    #[test]
    fn test_parse_data_uri_rejects_malformed() {
        for bad in [
            "audio/webm;base64,AAAA",
            "data:audio/webm,AAAA",
            "data:;base64,AAAA",
            "data:audio/webm;base64",
        ] {
            assert!(parse_data_uri(bad).is_err(), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_parse_data_uri_rejects_bad_base64() {
        let result = parse_data_uri("data:audio/webm;base64,@@not-base64@@");
        assert!(matches!(result, Err(MemoWeaveError::Base64(_))));
    }

    #[tokio::test]
    async fn test_speak_wraps_pcm_as_wav_uri() {
        let mut backend = ScriptedBackend::new(Vec::new());
        backend.pcm = vec![1, 2, 3, 4];

        let uri = speak(&backend, "hello", "alloy").await.unwrap();
        let payload = uri.strip_prefix("data:audio/wav;base64,").unwrap();
        let wav = BASE64.decode(payload).unwrap();
        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[44..], [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_speak_rejects_blank_text() {
        let backend = ScriptedBackend::new(Vec::new());
        let result = speak(&backend, "  ", "alloy").await;
        assert!(matches!(result, Err(MemoWeaveError::InvalidField { .. })));
    }

    #[tokio::test]
    async fn test_transcribe_routes_decoded_audio() {
        let mut backend = ScriptedBackend::new(Vec::new());
        backend.transcript = "note to self".to_string();
        let uri = format!("data:audio/wav;base64,{}", BASE64.encode(b"pcmpcm"));

        let text = transcribe(&backend, &uri).await.unwrap();
        assert_eq!(text, "note to self");
    }

    #[tokio::test]
    async fn test_transcribe_rejects_non_audio() {
        let backend = ScriptedBackend::new(Vec::new());
        let uri = format!("data:text/plain;base64,{}", BASE64.encode(b"hi"));
        let result = transcribe(&backend, &uri).await;
        assert!(matches!(result, Err(MemoWeaveError::DataUri(_))));
    }
}

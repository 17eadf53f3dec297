//! WAV wrapping and multipart bodies for batch transcription uploads.

use uuid::Uuid;

/// Wraps raw PCM16 (signed little-endian) samples in a WAV container.
pub fn wrap_pcm_in_wav(pcm: &[u8], sample_rate: u32, num_channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * u32::from(num_channels) * u32::from(bits_per_sample) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_len = pcm.len().min(u32::MAX as usize) as u32;
    // 44-byte header: RIFF (12) + fmt chunk (24) + data chunk header (8).
    let riff_len = 36u32.saturating_add(data_len);

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&riff_len.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&num_channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

/// Hand-assembled `multipart/form-data` body.
///
/// Kept local so the HTTP client does not need its multipart feature for the
/// one upload shape transcription endpoints take.
pub struct FormBody {
    boundary: String,
    bytes: Vec<u8>,
}

impl FormBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("----concierge-{}", Uuid::new_v4().simple()),
            bytes: Vec::new(),
        }
    }

    /// Appends a plain text field.
    pub fn push_text(&mut self, name: &str, value: &str) {
        self.bytes
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.bytes.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.extend_from_slice(b"\r\n");
    }

    /// Appends a file field.
    pub fn push_file(&mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) {
        self.bytes
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.bytes.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        self.bytes
            .extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        self.bytes.extend_from_slice(data);
        self.bytes.extend_from_slice(b"\r\n");
    }

    /// Closes the body and returns `(content_type_header, body)`.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.bytes
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        let content_type = format!("multipart/form-data; boundary={}", self.boundary);
        (content_type, self.bytes)
    }
}

impl Default for FormBody {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_is_well_formed() {
        let pcm = vec![0u8; 3200];
        let wav = wrap_pcm_in_wav(&pcm, 16_000, 1);

        assert_eq!(wav.len(), 44 + pcm.len());
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        // Sample rate at offset 24, little-endian.
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16_000);
        // Data length at offset 40.
        assert_eq!(
            u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize,
            pcm.len()
        );
    }

    #[test]
    fn wav_byte_rate_accounts_for_channels() {
        let wav = wrap_pcm_in_wav(&[0u8; 8], 24_000, 2);
        // Byte rate at offset 28: sample_rate * channels * 2.
        assert_eq!(
            u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]),
            24_000 * 2 * 2
        );
    }

    #[test]
    fn form_body_contains_fields_and_boundary() {
        let mut form = FormBody::new();
        form.push_text("model", "whisper-large-v3-turbo");
        form.push_file("file", "utterance.wav", "audio/wav", b"RIFFxxxx");
        let (content_type, body) = form.finish();

        let boundary = content_type
            .split("boundary=")
            .nth(1)
            .expect("boundary in content type");
        let body_text = String::from_utf8_lossy(&body);
        assert!(body_text.contains(&format!("--{boundary}\r\n")));
        assert!(body_text.contains("name=\"model\""));
        assert!(body_text.contains("whisper-large-v3-turbo"));
        assert!(body_text.contains("filename=\"utterance.wav\""));
        assert!(body_text.contains("Content-Type: audio/wav"));
        assert!(body_text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn form_boundaries_are_unique() {
        let (a, _) = FormBody::new().finish();
        let (b, _) = FormBody::new().finish();
        assert_ne!(a, b);
    }
}

//! User-facing texts.
//!
//! Every failure ends up as an assistant-role chat message, so all of the
//! strings a student can see live here, in Indonesian.

/// Greeting shown as the first assistant message of every conversation.
pub const GREETING: &str = "Halo! Saya APA Agent - agen kecerdasan buatan yang dirancang untuk membantu Anda memahami mata kuliah Manajemen Proyek. Sebagai panduan belajar interaktif, saya akan memberikan jawaban dan wawasan berdasarkan dokumentasi yang tersedia.\n\nGunakan saya untuk:\n• Memperdalam pemahaman konsep\n• Mencari informasi spesifik\n• Meninjau materi pelajaran\n• Mendapatkan penjelasan dengan contoh praktis\n\nSilakan pilih salah satu topik di bawah atau tanyakan langsung!";

/// Shown while a relay request is in flight.
pub const BUSY_INDICATOR: &str = "APA Agent sedang menganalisis...";

/// Substituted by the relay client when the endpoint cannot be reached or
/// answers with something other than a relay response.
pub const CLIENT_FALLBACK: &str =
    "Maaf, terjadi kesalahan saat menghubungi sistem. Silakan coba lagi dalam beberapa saat.";

/// Returned by the endpoint when no provider credential is configured.
pub const CONFIG_ERROR: &str = "Terjadi kesalahan konfigurasi API key.";

/// Returned by the endpoint (HTTP 500) for unanticipated failures.
pub const INTERNAL_ERROR: &str = "Terjadi kesalahan internal. Silakan coba lagi nanti.";

/// Substituted when the provider answers without any choice content.
pub const NO_RESPONSE: &str = "Maaf, saya tidak dapat memberikan respons saat ini.";

/// Detail used when the provider's error body carries no message.
pub const UNKNOWN_UPSTREAM_ERROR: &str = "Unknown error";

/// Reply for a provider call that came back with a non-success status.
pub fn upstream_error(detail: &str) -> String {
    format!(
        "Terjadi kesalahan saat menghubungi sistem: {detail}\n\nPastikan koneksi internet Anda stabil."
    )
}

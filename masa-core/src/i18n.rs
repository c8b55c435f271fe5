//! User-facing message catalogue.
//!
//! Errors carry a [`MessageKey`]; the text is picked at render time from the
//! caller's `Accept-Language`. English is the fallback for anything we do not
//! translate.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;
use serde::Serialize;

/// Supported response languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

impl Locale {
    /// Pick the first supported language from an `Accept-Language` value,
    /// honouring q-weights.
    pub fn from_accept_language(header: &str) -> Self {
        let mut ranked: Vec<(f32, &str)> = header
            .split(',')
            .filter_map(|part| {
                let mut pieces = part.trim().split(';');
                let tag = pieces.next()?.trim();
                if tag.is_empty() {
                    return None;
                }
                let q = pieces
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.parse::<f32>().ok())
                    .unwrap_or(1.0);
                Some((q, tag))
            })
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        for (_, tag) in ranked {
            let primary = tag.split('-').next().unwrap_or(tag).to_ascii_lowercase();
            match primary.as_str() {
                "tr" => return Locale::Tr,
                "en" => return Locale::En,
                _ => continue,
            }
        }
        Locale::En
    }

    pub fn from_parts(parts: &Parts) -> Self {
        parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Locale {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_parts(parts))
    }
}

/// Identifier of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    InvalidInput,
    InvalidTransition,
    NotFound,
    OrganizationNotFound,
    TableNotFound,
    CategoryNotFound,
    ProductNotFound,
    RequestNotFound,
    UserNotFound,
    PermissionDenied,
    Unauthenticated,
    InvalidCredentials,
    EmailTaken,
    InvalidResetToken,
    DatabaseError,
    RateLimited,
    TooManyRequests,
    UnknownError,
}

impl MessageKey {
    pub fn text(self, locale: Locale) -> &'static str {
        match locale {
            Locale::En => self.en(),
            Locale::Tr => self.tr(),
        }
    }

    fn en(self) -> &'static str {
        match self {
            MessageKey::InvalidInput => "The submitted data is invalid.",
            MessageKey::InvalidTransition => "This request can no longer be updated that way.",
            MessageKey::NotFound => "The requested record was not found.",
            MessageKey::OrganizationNotFound => "Restaurant not found.",
            MessageKey::TableNotFound => "Table not found.",
            MessageKey::CategoryNotFound => "Category not found.",
            MessageKey::ProductNotFound => "Product not found.",
            MessageKey::RequestNotFound => "Service request not found.",
            MessageKey::UserNotFound => "User not found.",
            MessageKey::PermissionDenied => "You do not have permission to do this.",
            MessageKey::Unauthenticated => "Please sign in to continue.",
            MessageKey::InvalidCredentials => "Invalid email or password.",
            MessageKey::EmailTaken => "An account with this email already exists.",
            MessageKey::InvalidResetToken => "The password reset link is invalid or has expired.",
            MessageKey::DatabaseError => "A database error occurred. Please try again.",
            MessageKey::RateLimited => {
                "Too many requests from this table. Please wait a few minutes."
            }
            MessageKey::TooManyRequests => "Too many requests. Please slow down.",
            MessageKey::UnknownError => "An unexpected error occurred.",
        }
    }

    fn tr(self) -> &'static str {
        match self {
            MessageKey::InvalidInput => "Gönderilen bilgiler geçersiz.",
            MessageKey::InvalidTransition => "Bu talep artık bu şekilde güncellenemez.",
            MessageKey::NotFound => "İstenen kayıt bulunamadı.",
            MessageKey::OrganizationNotFound => "Restoran bulunamadı.",
            MessageKey::TableNotFound => "Masa bulunamadı.",
            MessageKey::CategoryNotFound => "Kategori bulunamadı.",
            MessageKey::ProductNotFound => "Ürün bulunamadı.",
            MessageKey::RequestNotFound => "Servis talebi bulunamadı.",
            MessageKey::UserNotFound => "Kullanıcı bulunamadı.",
            MessageKey::PermissionDenied => "Bu işlem için yetkiniz yok.",
            MessageKey::Unauthenticated => "Devam etmek için lütfen giriş yapın.",
            MessageKey::InvalidCredentials => "E-posta veya şifre hatalı.",
            MessageKey::EmailTaken => "Bu e-posta ile kayıtlı bir hesap zaten var.",
            MessageKey::InvalidResetToken => {
                "Şifre sıfırlama bağlantısı geçersiz veya süresi dolmuş."
            }
            MessageKey::DatabaseError => "Veritabanı hatası oluştu. Lütfen tekrar deneyin.",
            MessageKey::RateLimited => {
                "Bu masadan çok fazla talep gönderildi. Lütfen birkaç dakika bekleyin."
            }
            MessageKey::TooManyRequests => "Çok fazla istek gönderildi. Lütfen biraz bekleyin.",
            MessageKey::UnknownError => "Beklenmeyen bir hata oluştu.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_turkish_from_region_tag() {
        assert_eq!(Locale::from_accept_language("tr-TR,tr;q=0.9,en;q=0.8"), Locale::Tr);
    }

    #[test]
    fn honours_q_weights() {
        assert_eq!(Locale::from_accept_language("tr;q=0.4, en;q=0.9"), Locale::En);
        assert_eq!(Locale::from_accept_language("de, tr;q=0.5"), Locale::Tr);
    }

    #[test]
    fn unknown_languages_fall_back_to_english() {
        assert_eq!(Locale::from_accept_language("de-DE, fr"), Locale::En);
        assert_eq!(Locale::from_accept_language(""), Locale::En);
    }

    #[test]
    fn every_key_has_both_languages() {
        let keys = [
            MessageKey::InvalidInput,
            MessageKey::RateLimited,
            MessageKey::RequestNotFound,
            MessageKey::Unauthenticated,
        ];
        for key in keys {
            assert_ne!(key.text(Locale::En), key.text(Locale::Tr));
        }
    }
}

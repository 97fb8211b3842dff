//! TLS material provisioning: load existing key/certificate files or
//! generate a self-signed pair on first use.
//!
//! An operator who points the certificate and key parameters at files that
//! do not exist yet gets a freshly generated pair at those exact paths;
//! files that already exist are never touched. A single missing file
//! regenerates the pair as a whole, never mixing old and new material.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use time::{Duration, OffsetDateTime};

use crate::config::{self, ConfigError};
use crate::params::ParamStore;

/// Subject and validity profile for generated certificates.
///
/// Generated keys are ECDSA P-256.
#[derive(Debug, Clone)]
pub struct CertProfile {
    pub common_name: String,
    pub organization: String,
    pub country: String,
    pub validity_days: i64,
    pub alt_names: Vec<String>,
}

impl CertProfile {
    /// Resolve the profile from the `http.cert.*` parameters.
    pub fn resolve(params: &ParamStore) -> Result<Self, ConfigError> {
        let alt_names = params
            .string(config::PARAM_CERT_ALT_NAMES)?
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        Ok(Self {
            common_name: params.string(config::PARAM_CERT_COMMON_NAME)?,
            organization: params.string(config::PARAM_CERT_ORGANIZATION)?,
            country: params.string(config::PARAM_CERT_COUNTRY)?,
            validity_days: params.parse(config::PARAM_CERT_VALIDITY_DAYS)?,
            alt_names,
        })
    }
}

/// Ensure usable TLS material exists at the given paths.
///
/// Both files present: leave them untouched, they are loaded at listen time.
/// Either file missing: generate a self-signed pair and write both.
pub fn provision(cert_path: &Path, key_path: &Path, profile: &CertProfile) -> Result<(), TlsError> {
    if cert_path.exists() && key_path.exists() {
        tracing::info!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            "loading existing TLS material"
        );
        return Ok(());
    }

    tracing::info!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "generating self-signed TLS material"
    );

    let mut params = CertificateParams::new(profile.alt_names.clone())?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, profile.common_name.as_str());
    if !profile.organization.is_empty() {
        dn.push(DnType::OrganizationName, profile.organization.as_str());
    }
    if !profile.country.is_empty() {
        dn.push(DnType::CountryName, profile.country.as_str());
    }
    params.distinguished_name = dn;

    let now = OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + Duration::days(profile.validity_days);

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    write_pem(key_path, &key_pair.serialize_pem())?;
    write_pem(cert_path, &cert.pem())?;
    Ok(())
}

fn write_pem(path: &Path, pem: &str) -> Result<(), TlsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| TlsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, pem).map_err(|source| TlsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to generate TLS material: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

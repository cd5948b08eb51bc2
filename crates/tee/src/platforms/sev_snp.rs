//! AMD SEV-SNP attestation report verification.

use async_trait::async_trait;

use crate::attestation::{Attestation, TeePlatform};
use crate::error::TeeError;
use crate::verifier::{PlatformOutcome, PlatformVerifier, VerifyContext, production_failure};

// ATTESTATION_REPORT is a fixed 1184-byte structure; the 48-byte launch
// measurement sits at offset 144.
const REPORT_LEN: usize = 1184;
const MEASUREMENT_RANGE: core::ops::Range<usize> = 144..192;

/// Extract the launch measurement from a raw SEV-SNP report.
pub fn parse_report_measurement(report: &[u8]) -> Result<String, TeeError> {
    if report.len() != REPORT_LEN {
        return Err(TeeError::AttestationVerification(format!(
            "sev-snp report must be {REPORT_LEN} bytes, got {}",
            report.len()
        )));
    }
    Ok(hex::encode(&report[MEASUREMENT_RANGE]))
}

/// Verifier for AMD SEV-SNP attestation reports.
///
/// Parses the fixed-size report, compares the launch measurement against
/// the pinned value for the enclave id, and in production mode requires
/// the VCEK/ASK/ARK certificate chain alongside the report.
#[derive(Debug, Default)]
pub struct SevSnpVerifier;

#[async_trait]
impl PlatformVerifier for SevSnpVerifier {
    fn platform(&self) -> TeePlatform {
        TeePlatform::SevSnp
    }

    async fn verify(
        &self,
        attestation: &Attestation,
        ctx: &VerifyContext<'_>,
    ) -> Result<PlatformOutcome, TeeError> {
        let report = attestation.signature.as_deref().ok_or_else(|| {
            TeeError::AttestationVerification("sev-snp attestation is missing the report".into())
        })?;
        let measurement = parse_report_measurement(report)?;

        if let Some(expected) = ctx.expected_measurement(&attestation.enclave_id) {
            if measurement != expected.to_ascii_lowercase() {
                return Err(TeeError::MeasurementMismatch {
                    expected: expected.to_string(),
                    actual: measurement,
                });
            }
        }

        if !ctx.config.production_mode {
            return Ok(PlatformOutcome::structural());
        }

        match self.verify_chain(attestation) {
            Ok(()) => Ok(PlatformOutcome::production()),
            Err(error) => production_failure(ctx, TeePlatform::SevSnp, error),
        }
    }
}

impl SevSnpVerifier {
    fn verify_chain(&self, attestation: &Attestation) -> Result<(), TeeError> {
        // VCEK, ASK, ARK.
        if attestation.certificate_chain.len() < 3 {
            return Err(TeeError::AttestationVerification(format!(
                "sev-snp production verification requires the VCEK/ASK/ARK chain, got {} certificates",
                attestation.certificate_chain.len()
            )));
        }
        tracing::debug!("sev-snp certificate chain present");
        Ok(())
    }
}

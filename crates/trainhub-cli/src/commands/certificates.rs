//! `trainhub certificates ...`

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_core::capability::Capability;
use trainhub_core::certificate::{verify, VerificationOutcome};

use super::{date, table, Context};

#[derive(Subcommand)]
pub enum CertificatesCommand {
    /// List your certificates
    List,

    /// Check a verification code (no login needed)
    Verify { code: String },

    /// Save a certificate document
    Download {
        id: String,

        #[arg(long)]
        out: PathBuf,
    },
}

pub async fn execute(config_path: Option<&Path>, cmd: CertificatesCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        CertificatesCommand::List => {
            let certificates = session
                .authorized(Capability::ViewCertificates, |api| async move {
                    api.list_certificates().await
                })
                .await?;
            if certificates.is_empty() {
                println!("No certificates yet.");
                return Ok(());
            }
            let mut t = table(vec![
                "ID", "Number", "Program", "Recipient", "Issued", "Expires", "Status",
            ]);
            for c in &certificates {
                t.add_row(vec![
                    Cell::new(&c.id),
                    Cell::new(&c.certificate_number),
                    Cell::new(&c.program_title),
                    Cell::new(&c.recipient_name),
                    Cell::new(date(c.issued_date)),
                    Cell::new(date(c.expiry_date)),
                    Cell::new(if c.is_valid { "valid" } else { "invalid" }),
                ]);
            }
            println!("{t}");
        }
        CertificatesCommand::Verify { code } => {
            let outcome = session
                .authorized(Capability::VerifyCertificates, |api| async move {
                    verify(api.as_ref(), &code).await
                })
                .await?;
            match outcome {
                VerificationOutcome::Valid(c) => {
                    println!("VALID");
                    println!("number:    {}", c.certificate_number);
                    println!("program:   {}", c.program_title);
                    println!("recipient: {}", c.recipient_name);
                    println!("issued:    {}", date(c.issued_date));
                    println!("expires:   {}", date(c.expiry_date));
                }
                VerificationOutcome::Invalid(message) => println!("INVALID: {message}"),
            }
        }
        CertificatesCommand::Download { id, out } => {
            let bytes = session
                .authorized(Capability::ViewCertificates, |api| async move {
                    api.download_certificate(&id).await
                })
                .await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Saved certificate ({} bytes) to {}", bytes.len(), out.display());
        }
    }
    Ok(())
}

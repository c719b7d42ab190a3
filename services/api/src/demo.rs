use crate::infra::SandboxGateway;
use chrono::NaiveDate;
use clap::Args;
use kyc_gateway::config::AppConfig;
use kyc_gateway::error::AppError;
use kyc_gateway::telemetry;
use kyc_gateway::workflows::verification::{
    Customer, DocumentImage, DocumentType, IdentityDocument, VerificationOrchestrator,
    VerificationResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    /// Customer first name
    #[arg(long)]
    pub(crate) first_name: String,
    /// Customer last name
    #[arg(long)]
    pub(crate) last_name: String,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date_of_birth: Option<NaiveDate>,
    /// Issuing country of the identity document (ISO 3166 alpha-3)
    #[arg(long, default_value = "GBR")]
    pub(crate) country: String,
    /// Kind of identity document supplied
    #[arg(long = "document-type", default_value = "passport", value_parser = parse_document_type)]
    pub(crate) document_type: DocumentType,
    /// Document number. Prefix with DENY, RETRY or REVIEW to steer the sandbox outcome.
    #[arg(long)]
    pub(crate) document_number: Option<String>,
    /// Image files for the document, front side first
    #[arg(long = "document", required = true)]
    pub(crate) documents: Vec<PathBuf>,
    /// Override the configured verification deadline
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,
    /// Status checks the sandbox vendor answers with "pending" before completing
    #[arg(long, default_value_t = 2)]
    pub(crate) sandbox_polls: u32,
}

pub(crate) async fn run_verify(args: VerifyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, config.environment)?;

    let mut verification = config.verification;
    if let Some(secs) = args.timeout_secs {
        verification.timeout_threshold = Duration::from_secs(secs);
    }

    let customer = customer_from_args(&args)?;
    let gateway = Arc::new(SandboxGateway::new(args.sandbox_polls));
    let orchestrator = VerificationOrchestrator::from_config(gateway, &verification);

    println!("KYC verification demo (sandbox vendor)");
    println!(
        "Customer: {} | documents: {} | deadline: {}s",
        customer.full_name(),
        customer.evidence().len(),
        orchestrator.policy().timeout.as_secs()
    );

    match orchestrator.verify(&customer).await {
        Ok(result) => {
            if let Some(case) = &result.case_reference {
                println!("Case {}: submitted {}", case, describe_evidence(&customer));
            }
            render_result(&result);
            Ok(())
        }
        Err(err) => {
            println!("Verification failed: {}", err);
            render_result(&err.result());
            Err(err.into())
        }
    }
}

fn describe_evidence(customer: &Customer) -> String {
    customer
        .evidence()
        .iter()
        .map(|item| item.describe())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_result(result: &VerificationResult) {
    println!("Outcome: {}", result.summary());
    if result.requires_followup() {
        println!("  Case is awaiting manual review; keep the case reference for follow-up.");
    }
    match serde_json::to_string_pretty(result) {
        Ok(json) => println!("Result payload:\n{}", json),
        Err(err) => println!("Result payload unavailable: {}", err),
    }
}

fn customer_from_args(args: &VerifyArgs) -> Result<Customer, AppError> {
    let mut images = args
        .documents
        .iter()
        .map(|path| load_image(path))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let document = IdentityDocument {
        doc_type: args.document_type.clone(),
        country: args.country.clone(),
        number: args.document_number.clone(),
        issued_on: None,
        valid_until: None,
        front: images.next(),
        back: images.next(),
    };

    // Files beyond front and back are attached as supplementary pages.
    let extra = images.map(|image| IdentityDocument {
        doc_type: DocumentType::Other("supplementary".to_string()),
        country: args.country.clone(),
        number: None,
        issued_on: None,
        valid_until: None,
        front: Some(image),
        back: None,
    });

    Ok(Customer {
        first_name: args.first_name.clone(),
        middle_name: None,
        last_name: args.last_name.clone(),
        date_of_birth: args.date_of_birth,
        email: None,
        phone: None,
        addresses: Vec::new(),
        documents: std::iter::once(document).chain(extra).collect(),
    })
}

fn load_image(path: &Path) -> Result<DocumentImage, std::io::Error> {
    let data = std::fs::read(path)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(DocumentImage {
        filename,
        content_type,
        data,
    })
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
    let document_type = match normalized.as_str() {
        "passport" => DocumentType::Passport,
        "id_card" | "id" => DocumentType::IdCard,
        "driving_license" | "drivers" => DocumentType::DrivingLicense,
        "residence_permit" => DocumentType::ResidencePermit,
        "utility_bill" => DocumentType::UtilityBill,
        "selfie" => DocumentType::Selfie,
        "" => return Err("document type must not be empty".to_string()),
        _ => DocumentType::Other(raw.trim().to_string()),
    };
    Ok(document_type)
}

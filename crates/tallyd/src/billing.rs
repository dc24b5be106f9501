//! Bill repositories.
//!
//! A bill repository is an S3 location (bucket+prefix) where Cost And
//! Usage Reports can be found for an AWS account. This module registers
//! `/aws/billrepository`: GET lists the account's repositories, POST adds
//! one after validating the S3 naming rules, then kicks off a detached
//! report update so the reply does not wait on the import.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use http::StatusCode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use tally_core::{Arguments, Payload, Request};
use tally_extract::{take_body, QueryArg, QueryArgs, RequestBody, RequestContentType, Uint};
use tally_routes::{route, Documentation, MethodMuxer, RegistryError, RouteTable};
use tally_tasks::Spawner;

use crate::auth::{RequireAuthenticatedUser, TokenVerifier, AUTHENTICATED_USER};
use crate::db::{with_transaction, RequestTransaction, Store};

/// How long after an import the next report update is due.
const REPORT_UPDATE_INTERVAL_HOURS: i64 = 12;

/// Selects the AWS account the bill repositories belong to.
pub static AWS_ACCOUNT_ARG: QueryArg<Uint> = QueryArg::new(
    "account",
    "The ID of the AWS account the bill repositories belong to.",
);

/// A location where the server may look for bill objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillRepository {
    /// Storage identifier.
    pub id: u64,
    /// Owning AWS account.
    #[serde(rename = "awsAccountId")]
    pub aws_account_id: u64,
    /// S3 bucket name.
    pub bucket: String,
    /// Key prefix under which reports live.
    pub prefix: String,
    /// When the next report update is due.
    #[serde(rename = "nextUpdate")]
    pub next_update: DateTime<Utc>,
}

impl BillRepository {
    pub(crate) fn new(id: u64, aws_account_id: u64, bucket: &str, prefix: &str) -> Self {
        Self {
            id,
            aws_account_id,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            next_update: Utc::now() + Duration::hours(REPORT_UPDATE_INTERVAL_HOURS),
        }
    }
}

// Lowercase letters, digits, dashes; dots allowed but never two in a row.
static BUCKET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z-](?:[a-z0-9.-]?[a-z0-9-])+$").expect("bucket name regex compiles")
});

/// The POST body: the S3 location to register.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostBillRepositoryBody {
    /// S3 bucket name, constrained by the S3 naming rules.
    #[validate(
        length(min = 3, max = 63, message = "bucket name shall be between 3 and 63 chars"),
        regex(
            path = *BUCKET_NAME_RE,
            message = "bucket name shall contain only lowercase letters, digits, dots and dashes, with no two consecutive dots"
        )
    )]
    pub bucket: String,
    /// Key prefix; may be empty.
    #[validate(length(max = 1024, message = "key prefix shall be no longer than 1024 chars"))]
    pub prefix: String,
}

/// Registers `/aws/billrepository`.
pub fn register(
    table: &mut RouteTable,
    store: Arc<Store>,
    verifier: Arc<dyn TokenVerifier>,
    spawner: Spawner,
) -> Result<(), RegistryError> {
    MethodMuxer::new()
        .get(route(get_bill_repositories).with(Documentation {
            summary: "get aws account's bill repositories",
            description: "Gets the list of bill repositories for an AWS account.",
        }))
        .post(
            route(move |request, arguments| {
                post_bill_repository(spawner.clone(), request, arguments)
            })
            .with(RequestContentType::json())
            .with(RequestBody::new(PostBillRepositoryBody {
                bucket: "my-bucket".to_string(),
                prefix: "bills/".to_string(),
            }))
            .with(Documentation {
                summary: "add a new bill repository to an aws account",
                description: "Adds a bill repository to an AWS account.",
            }),
        )
        .with(RequestTransaction::new(store))
        .with(RequireAuthenticatedUser::new(verifier))
        .with(QueryArgs(vec![&AWS_ACCOUNT_ARG]))
        .with(Documentation {
            summary: "interact with aws account's bill repositories",
            description:
                "A bill repository is an S3 location (bucket+prefix) where Cost And Usage Reports \
                 can be found.",
        })
        .register(table, "/aws/billrepository")
}

async fn get_bill_repositories(_request: Request, arguments: Arguments) -> (StatusCode, Payload) {
    let aws_account_id = *arguments.expect(AWS_ACCOUNT_ARG.key());
    let repositories = with_transaction(&arguments, |transaction| {
        transaction.bill_repositories_for_account(aws_account_id)
    });
    (
        StatusCode::OK,
        Payload::Data(serde_json::to_value(&repositories).expect("serialize bill repositories")),
    )
}

async fn post_bill_repository(
    spawner: Spawner,
    _request: Request,
    mut arguments: Arguments,
) -> (StatusCode, Payload) {
    let body: PostBillRepositoryBody = take_body(&mut arguments);
    let aws_account_id = *arguments.expect(AWS_ACCOUNT_ARG.key());
    let user = arguments.expect(&AUTHENTICATED_USER);

    let repository = with_transaction(&arguments, |transaction| {
        transaction.insert_bill_repository(aws_account_id, &body.bucket, &body.prefix)
    });
    tracing::info!(
        user_id = user.id,
        bucket = %repository.bucket,
        repository_id = repository.id,
        "bill repository created"
    );

    // The import is long-running; it must survive this request's reply.
    spawner.spawn(
        "bill-repository-report-update",
        update_report(repository.clone()),
    );

    (
        StatusCode::OK,
        Payload::Data(serde_json::to_value(&repository).expect("serialize bill repository")),
    )
}

/// Walks the repository's reports and refreshes the imported data. The
/// actual S3 import lives in the reports collaborator; this drives it and
/// reports the outcome to the log.
async fn update_report(repository: BillRepository) -> Result<(), std::convert::Infallible> {
    tracing::info!(
        repository_id = repository.id,
        bucket = %repository.bucket,
        prefix = %repository.prefix,
        "updating bill repository report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(bucket: &str, prefix: &str) -> PostBillRepositoryBody {
        PostBillRepositoryBody {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }
    }

    #[test]
    fn valid_buckets_pass() {
        assert!(body("my-bucket", "bills/").validate().is_ok());
        assert!(body("logs.2017", "").validate().is_ok());
        assert!(body("abc", "").validate().is_ok());
    }

    #[test]
    fn short_bucket_fails_on_length() {
        let errors = body("x", "").validate().expect_err("too short");
        assert!(errors.field_errors().contains_key("bucket"));
    }

    #[test]
    fn long_bucket_fails_on_length() {
        let errors = body(&"a".repeat(64), "").validate().expect_err("too long");
        assert!(errors.field_errors().contains_key("bucket"));
    }

    #[test]
    fn consecutive_dots_fail_on_the_regex() {
        let errors = body("my..bucket", "").validate().expect_err("double dot");
        assert!(errors.field_errors().contains_key("bucket"));
    }

    #[test]
    fn uppercase_buckets_fail_on_the_regex() {
        assert!(body("My-Bucket", "").validate().is_err());
    }

    #[test]
    fn oversized_prefix_fails() {
        let errors = body("my-bucket", &"p".repeat(1025))
            .validate()
            .expect_err("prefix too long");
        assert!(errors.field_errors().contains_key("prefix"));
    }

    #[test]
    fn empty_prefix_is_allowed() {
        assert!(body("my-bucket", "").validate().is_ok());
    }

    #[test]
    fn repository_serializes_with_wire_names() {
        let repository = BillRepository::new(3, 9, "my-bucket", "bills/");
        let value = serde_json::to_value(&repository).expect("serialize");
        assert_eq!(value["awsAccountId"], serde_json::json!(9));
        assert_eq!(value["bucket"], serde_json::json!("my-bucket"));
        assert!(value.get("nextUpdate").is_some());
    }
}

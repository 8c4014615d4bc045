use std::sync::Arc;

use blp_get_bookings::config::HandlerConfig;
use blp_get_bookings::handler::GetBookings;
use blp_store::{DynamoBookingStore, FieldCipher, KmsKeyService};
use lambda_http::{run, service_fn, Body, Error, Request, Response};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match HandlerConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("STARTUP_ERROR {}", err);
            std::process::exit(1);
        }
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let repository = Arc::new(DynamoBookingStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        config.booking_table.clone(),
    ));
    // Decrypt-only; KMS resolves the key from the ciphertext.
    let cipher = FieldCipher::new(Arc::new(KmsKeyService::new(
        aws_sdk_kms::Client::new(&aws_config),
        None,
    )));
    let handler = GetBookings::new(repository, cipher, config.cors.clone());

    run(service_fn(|event| invoke(&handler, event))).await
}

async fn invoke(handler: &GetBookings, event: Request) -> Result<Response<Body>, Error> {
    handler.handle(&event).await.into_response().map_err(Error::from)
}

use std::sync::Arc;

use blp_auth::{AuthGate, CognitoIdentityProvider, SsmParameterStore};
use blp_get_bags::config::HandlerConfig;
use blp_get_bags::handler::GetBags;
use blp_store::DynamoBagStore;
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
    let repository = Arc::new(DynamoBagStore::new(
        aws_sdk_dynamodb::Client::new(&aws_config),
        config.bag_table.clone(),
    ));
    let gate = AuthGate::new(
        Arc::new(CognitoIdentityProvider::new(
            aws_sdk_cognitoidentityprovider::Client::new(&aws_config),
        )),
        Arc::new(SsmParameterStore::new(aws_sdk_ssm::Client::new(&aws_config))),
        config.pool_id_parameter.clone(),
    );
    let handler = GetBags::new(
        repository,
        gate,
        config.allowed_roles.clone(),
        config.cors.clone(),
    );

    run(service_fn(|event| invoke(&handler, event))).await
}

async fn invoke(handler: &GetBags, event: Request) -> Result<Response<Body>, Error> {
    handler.handle(&event).await.into_response().map_err(Error::from)
}

//! Credential resource implementation
//!
//! Tines never returns secret material, so secrets in state always come from
//! configuration. Refresh only reconciles the attributes the API echoes back.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::StateBuilder;

use super::{api_error, bool_attr, i64_attr, refresh_error, state_id, string_attr};
use crate::api::credentials::Credential;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_credential";

const STRING_ATTRIBUTES: [&str; 19] = [
    "name",
    "mode",
    "read_access",
    "description",
    "jwt_algorithm",
    "jwt_payload",
    "oauth_url",
    "oauth_token_url",
    "oauth_client_id",
    "oauth_scope",
    "oauth_grant_type",
    "aws_authentication_type",
    "aws_access_key",
    "aws_assumed_role_arn",
    "aws_assumed_role_external_id",
    "http_request_options",
    "http_request_location_of_token",
    "mtls_client_certificate",
    "mtls_root_certificate",
];

const SECRET_ATTRIBUTES: [&str; 5] = [
    "value",
    "jwt_private_key",
    "oauth_client_secret",
    "aws_secret_key",
    "mtls_client_private_key",
];

#[derive(Default)]
pub struct CredentialResource {
    provider_data: Option<TinesProviderData>,
}

impl CredentialResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plan_to_credential(planned: &DynamicValue) -> Credential {
    Credential {
        name: string_attr(planned, "name"),
        mode: string_attr(planned, "mode"),
        team_id: i64_attr(planned, "team_id"),
        folder_id: i64_attr(planned, "folder_id"),
        read_access: string_attr(planned, "read_access"),
        description: string_attr(planned, "description"),
        value: string_attr(planned, "value"),
        jwt_algorithm: string_attr(planned, "jwt_algorithm"),
        jwt_payload: string_attr(planned, "jwt_payload"),
        jwt_auto_generate_time_claims: bool_attr(planned, "jwt_auto_generate_time_claims"),
        jwt_private_key: string_attr(planned, "jwt_private_key"),
        oauth_url: string_attr(planned, "oauth_url"),
        oauth_token_url: string_attr(planned, "oauth_token_url"),
        oauth_client_id: string_attr(planned, "oauth_client_id"),
        oauth_client_secret: string_attr(planned, "oauth_client_secret"),
        oauth_scope: string_attr(planned, "oauth_scope"),
        oauth_grant_type: string_attr(planned, "oauth_grant_type"),
        aws_authentication_type: string_attr(planned, "aws_authentication_type"),
        aws_access_key: string_attr(planned, "aws_access_key"),
        aws_secret_key: string_attr(planned, "aws_secret_key"),
        aws_assumed_role_arn: string_attr(planned, "aws_assumed_role_arn"),
        aws_assumed_role_external_id: string_attr(planned, "aws_assumed_role_external_id"),
        http_request_options: string_attr(planned, "http_request_options"),
        http_request_location_of_token: string_attr(planned, "http_request_location_of_token"),
        mtls_client_certificate: string_attr(planned, "mtls_client_certificate"),
        mtls_client_private_key: string_attr(planned, "mtls_client_private_key"),
        mtls_root_certificate: string_attr(planned, "mtls_root_certificate"),
        ..Default::default()
    }
}

/// Overlay the non-secret fields Tines returned onto `base`.
fn credential_to_state(base: &DynamicValue, credential: &Credential) -> DynamicValue {
    let echoed = [
        ("name", &credential.name),
        ("mode", &credential.mode),
        ("read_access", &credential.read_access),
        ("description", &credential.description),
        ("jwt_algorithm", &credential.jwt_algorithm),
        ("jwt_payload", &credential.jwt_payload),
        ("oauth_url", &credential.oauth_url),
        ("oauth_token_url", &credential.oauth_token_url),
        ("oauth_client_id", &credential.oauth_client_id),
        ("oauth_scope", &credential.oauth_scope),
        ("oauth_grant_type", &credential.oauth_grant_type),
        ("aws_authentication_type", &credential.aws_authentication_type),
        ("aws_access_key", &credential.aws_access_key),
        ("aws_assumed_role_arn", &credential.aws_assumed_role_arn),
        (
            "aws_assumed_role_external_id",
            &credential.aws_assumed_role_external_id,
        ),
        ("http_request_options", &credential.http_request_options),
        (
            "http_request_location_of_token",
            &credential.http_request_location_of_token,
        ),
        ("mtls_client_certificate", &credential.mtls_client_certificate),
        ("mtls_root_certificate", &credential.mtls_root_certificate),
    ];

    let mut builder = StateBuilder::from_state(base).opt_int("id", credential.id);
    for (name, value) in echoed {
        if let Some(value) = value {
            builder = builder.string(name, value.clone());
        }
    }
    if let Some(team_id) = credential.team_id {
        builder = builder.int("team_id", team_id);
    }
    if let Some(folder_id) = credential.folder_id {
        builder = builder.int("folder_id", folder_id);
    }
    if let Some(claims) = credential.jwt_auto_generate_time_claims {
        builder = builder.bool("jwt_auto_generate_time_claims", claims);
    }

    builder.build()
}

#[async_trait]
impl Resource for CredentialResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description("Manages a Tines credential.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("The Tines-generated identifier for this credential.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("jwt_auto_generate_time_claims", AttributeType::Bool)
                    .optional()
                    .build(),
            );

        for name in STRING_ATTRIBUTES {
            builder = builder.attribute(
                AttributeBuilder::new(name, AttributeType::String)
                    .optional()
                    .build(),
            );
        }
        for name in SECRET_ATTRIBUTES {
            builder = builder.attribute(
                AttributeBuilder::new(name, AttributeType::String)
                    .optional()
                    .sensitive()
                    .build(),
            );
        }

        ResourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        tracing::info!("Creating Credential");

        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let credential = plan_to_credential(&request.planned_state);
        match provider_data.client.credentials().create(&credential).await {
            Ok(created) => CreateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .opt_int("id", created.id)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![api_error(
                    "Error Creating Tines Credential",
                    "create credential",
                    &e,
                )],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
                private: request.private,
            };
        };

        let id = match state_id(&request.current_state, "Credential") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.credentials().get(id).await {
            Ok(credential) => ReadResourceResponse {
                new_state: Some(credential_to_state(&request.current_state, &credential)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Credential no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![refresh_error(&e)],
                private: request.private,
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        tracing::info!("Updating Credential");

        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let id = match state_id(&request.prior_state, "Credential") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let credential = plan_to_credential(&request.planned_state);
        match provider_data
            .client
            .credentials()
            .update(id, &credential)
            .await
        {
            Ok(_) => UpdateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .int("id", id)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![api_error(
                    "Error Updating Tines Credential",
                    "update credential",
                    &e,
                )],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Credential") {
            Ok(id) => match provider_data.client.credentials().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error(
                    "Error Deleting Tines Credential",
                    "delete credential",
                    &e,
                )],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for CredentialResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match TinesProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = data;
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

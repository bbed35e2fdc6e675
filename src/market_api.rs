// Typed client for the remote marketplace REST API. One method per consumed
// endpoint, all going through the shared reqwest client; the bearer token is
// attached whenever the caller has a session. Status mapping: 401 ->
// Unauthorized, 404 -> NotFound, transport failures -> Network, and a decoded
// envelope with success:false -> Api(message).

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::filters::VehicleFilters;
use crate::models::{
    ApiEnvelope, AuthPayload, FavoriteCheck, LoginRequest, PaginatedEnvelope, Pagination,
    RegisterRequest, User, Vehicle,
};

pub struct MarketApi {
    client: Arc<Client>,
    base_url: String,
}

impl MarketApi {
    pub fn new(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        MarketApi { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_token(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Sends the request and applies the status mapping common to every
    /// endpoint. Bodies of 2xx/4xx responses still carry the envelope, so
    /// decoding happens after this step.
    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Transport failure talking to the marketplace API: {}", e);
            ApiError::Network(e.to_string())
        })?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            _ => Ok(response),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("invalid response body: {}", e)))?;
        if !envelope.success {
            return Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "Pedido rejeitado pela API".to_owned()),
            ));
        }
        // success:true without data is a malformed envelope, not a
        // transport failure
        envelope
            .data
            .ok_or_else(|| ApiError::Api("Resposta inválida da API".to_owned()))
    }

    /// For mutations whose response data is irrelevant; only the success
    /// flag and message are inspected.
    async fn decode_ack(response: reqwest::Response) -> Result<(), ApiError> {
        let envelope: ApiEnvelope<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("invalid response body: {}", e)))?;
        if !envelope.success {
            return Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "Pedido rejeitado pela API".to_owned()),
            ));
        }
        Ok(())
    }

    // --- Vehicles ---

    pub async fn list_vehicles(
        &self,
        filters: &VehicleFilters,
        per_page: u32,
    ) -> Result<(Vec<Vehicle>, Pagination), ApiError> {
        let params = filters.to_api_params(per_page);
        tracing::debug!(?params, "GET /vehicles");
        let response = self
            .send(self.client.get(self.url("/vehicles")).query(&params))
            .await?;
        let envelope: PaginatedEnvelope<Vehicle> = response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("invalid response body: {}", e)))?;
        if !envelope.success {
            return Err(ApiError::Api(
                envelope
                    .message
                    .unwrap_or_else(|| "Erro ao carregar veículos".to_owned()),
            ));
        }
        let pagination = envelope.pagination.unwrap_or(Pagination {
            current_page: filters.page,
            last_page: filters.page,
            per_page,
            total: envelope.data.len() as u64,
        });
        Ok((envelope.data, pagination))
    }

    pub async fn get_vehicle(&self, id: i64) -> Result<Vehicle, ApiError> {
        let response = self
            .send(self.client.get(self.url(&format!("/vehicles/{}", id))))
            .await?;
        Self::decode(response).await
    }

    pub async fn featured_vehicles(&self) -> Result<Vec<Vehicle>, ApiError> {
        let response = self
            .send(self.client.get(self.url("/vehicles/featured/list")))
            .await?;
        Self::decode(response).await
    }

    // --- Favorites ---

    pub async fn favorites(&self, token: &str) -> Result<Vec<Vehicle>, ApiError> {
        let request = Self::with_token(self.client.get(self.url("/favorites")), Some(token));
        let response = self.send(request).await?;
        Self::decode(response).await
    }

    pub async fn add_favorite(&self, token: &str, vehicle_id: i64) -> Result<(), ApiError> {
        let request = Self::with_token(self.client.post(self.url("/favorites")), Some(token))
            .json(&serde_json::json!({ "vehicle_id": vehicle_id }));
        let response = self.send(request).await?;
        Self::decode_ack(response).await
    }

    pub async fn remove_favorite(&self, token: &str, vehicle_id: i64) -> Result<(), ApiError> {
        let request = Self::with_token(
            self.client
                .delete(self.url(&format!("/favorites/{}", vehicle_id))),
            Some(token),
        );
        let response = self.send(request).await?;
        Self::decode_ack(response).await
    }

    pub async fn check_favorite(&self, token: &str, vehicle_id: i64) -> Result<bool, ApiError> {
        let request = Self::with_token(
            self.client
                .get(self.url(&format!("/favorites/check/{}", vehicle_id))),
            Some(token),
        );
        let response = self.send(request).await?;
        let check: FavoriteCheck = Self::decode(response).await?;
        Ok(check.is_favorite)
    }

    // --- Auth ---

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let body = LoginRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        };
        let response = self
            .send(self.client.post(self.url("/auth/login")).json(&body))
            .await?;
        Self::decode(response).await
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<AuthPayload, ApiError> {
        let response = self
            .send(self.client.post(self.url("/auth/register")).json(body))
            .await?;
        Self::decode(response).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        let request = Self::with_token(self.client.post(self.url("/auth/logout")), Some(token));
        let response = self.send(request).await?;
        Self::decode_ack(response).await
    }

    pub async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        let request = Self::with_token(self.client.get(self.url("/auth/me")), Some(token));
        let response = self.send(request).await?;
        Self::decode(response).await
    }
}

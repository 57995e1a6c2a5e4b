//! Remote Store Client: one network round trip per CRUD call.
//!
//! No retry and no caching. Every failure is returned to the caller.

use tracing::debug;

use crate::client::PetClient;
use crate::error::RequestError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{NewPet, Pet, PetId};

/// Pairs a `PetClient` with a `Transport`.
#[derive(Debug, Clone)]
pub struct RemoteStore<T> {
    client: PetClient,
    transport: T,
}

impl<T: Transport> RemoteStore<T> {
    pub fn new(client: PetClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &PetClient {
        &self.client
    }

    pub async fn list(&self) -> Result<Vec<Pet>, RequestError> {
        let response = self.round_trip(self.client.build_list_pets()).await?;
        self.client.parse_list_pets(response)
    }

    pub async fn create(&self, pet: &NewPet) -> Result<Pet, RequestError> {
        let request = self.client.build_create_pet(pet)?;
        let response = self.round_trip(request).await?;
        self.client.parse_create_pet(response)
    }

    pub async fn update(&self, pet: &Pet) -> Result<Pet, RequestError> {
        let request = self.client.build_update_pet(pet)?;
        let response = self.round_trip(request).await?;
        self.client.parse_update_pet(response)
    }

    pub async fn delete(&self, id: &PetId) -> Result<(), RequestError> {
        let response = self.round_trip(self.client.build_delete_pet(id)).await?;
        self.client.parse_delete_pet(response)
    }

    async fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        debug!(method = %request.method, path = %request.path, "sending request");
        let response = self.transport.execute(request).await?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

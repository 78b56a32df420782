// Sols are rotating savings groups: every member contributes each round
// and one member collects the pot.

use serde_json::json;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Contribution, NewSol, Sol, SolUpdate};
use crate::transport::Confirmed;

impl ApiClient {
    pub async fn list_sols(&self) -> Result<Confirmed<Vec<Sol>>, Error> {
        self.get_json("/sols").await
    }

    pub async fn get_sol(&self, id: &str) -> Result<Confirmed<Sol>, Error> {
        self.get_json(&format!("/sols/{id}")).await
    }

    pub async fn create_sol(&self, sol: &NewSol) -> Result<Confirmed<Sol>, Error> {
        self.post_json("/sols", sol).await
    }

    pub async fn update_sol(&self, id: &str, update: &SolUpdate) -> Result<Confirmed<Sol>, Error> {
        self.patch_json(&format!("/sols/{id}"), update).await
    }

    /// Returns the sol with the caller added to its members.
    pub async fn join_sol(&self, id: &str) -> Result<Confirmed<Sol>, Error> {
        self.post_json(&format!("/sols/{id}/join"), &json!({})).await
    }

    /// Record a contribution for the current round; returns the updated sol.
    pub async fn contribute_to_sol(
        &self,
        id: &str,
        contribution: &Contribution,
    ) -> Result<Confirmed<Sol>, Error> {
        self.post_json(&format!("/sols/{id}/contributions"), contribution)
            .await
    }
}

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Budget, BudgetUpdate, NewBudget};
use crate::transport::Confirmed;

impl ApiClient {
    pub async fn list_budgets(&self) -> Result<Confirmed<Vec<Budget>>, Error> {
        self.get_json("/budgets").await
    }

    pub async fn create_budget(&self, budget: &NewBudget) -> Result<Confirmed<Budget>, Error> {
        self.post_json("/budgets", budget).await
    }

    pub async fn update_budget(
        &self,
        id: &str,
        update: &BudgetUpdate,
    ) -> Result<Confirmed<Budget>, Error> {
        self.patch_json(&format!("/budgets/{id}"), update).await
    }
}

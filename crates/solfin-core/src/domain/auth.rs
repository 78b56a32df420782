// Auth store: sign-in state and the user profile.
//
// The session store in `solfin-api` owns the credentials; this store
// mirrors the signed-in user into a one-entry collection so front ends
// can subscribe to it like any other domain.

use std::ops::Deref;
use std::sync::Arc;

use secrecy::SecretString;
use solfin_api::{ApiClient, Confirmed};

use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{ProfileUpdate, RegisterRequest, User};
use crate::store::{DomainStore, EntityCollection, OperationKind, RunOptions};

pub struct AuthStore {
    store: DomainStore<User>,
    api: ApiClient,
}

impl Deref for AuthStore {
    type Target = DomainStore<User>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

fn install_user(collection: &EntityCollection<User>, user: &User, _: Option<&str>) {
    collection.replace_all(vec![user.clone()]);
}

impl AuthStore {
    pub fn new(api: ApiClient, bus: Arc<LifecycleBus>) -> Self {
        let store = DomainStore::new("auth", bus);
        if let Some(user) = api.session().user() {
            store.collection().upsert(user);
        }
        Self { store, api }
    }

    pub fn current_user(&self) -> Option<User> {
        self.api.session().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated()
    }

    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, CoreError> {
        self.store
            .run(
                OperationKind::LOGIN,
                RunOptions::new(),
                self.api.login(email, password),
                install_user,
            )
            .await
    }

    pub async fn register(&self, form: RegisterRequest) -> Result<User, CoreError> {
        self.store
            .run(
                OperationKind::REGISTER,
                RunOptions::new().success_message("Welcome to solfin"),
                self.api.register(&form),
                install_user,
            )
            .await
    }

    /// Never fails: the local session is cleared even when the server
    /// cannot be reached.
    pub async fn logout(&self) -> Result<(), CoreError> {
        let api = &self.api;
        self.store
            .run(
                OperationKind::LOGOUT,
                RunOptions::new(),
                async move { Ok::<Confirmed<()>, CoreError>(api.logout().await) },
                |collection, _, _| collection.clear(),
            )
            .await
    }

    pub async fn fetch_profile(&self) -> Result<User, CoreError> {
        self.store
            .run(
                OperationKind::FETCH_PROFILE,
                RunOptions::quiet(),
                self.api.me(),
                install_user,
            )
            .await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, CoreError> {
        self.store
            .run(
                OperationKind::UPDATE_PROFILE,
                RunOptions::new(),
                self.api.update_profile(&update),
                install_user,
            )
            .await
    }
}

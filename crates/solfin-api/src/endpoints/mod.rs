// Endpoint groups, one file per resource. Each adds inherent methods to
// `ApiClient` that return the decoded payload with the server message.

mod accounts;
mod auth;
mod budgets;
mod sols;
mod transactions;

//! Request handler
//!
//! Every request runs to completion under one global mutex around the
//! catalog: parse, dispatch, encode. Errors become error envelopes; the
//! handler itself never fails.
//!
//! Once a fatal WAL failure halts the store, every later request is refused
//! and [`ApiHandler::is_halted`] tells the serving loop to stop.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::request::Request;
use super::response::Response;
use crate::catalog::Catalog;
use crate::observability::Event;

pub struct ApiHandler {
    catalog: Mutex<Catalog>,
}

impl ApiHandler {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Mutex::new(catalog),
        }
    }

    /// Handles one raw JSON request.
    pub fn handle(&self, json_request: &str) -> Response {
        let started = Instant::now();
        let request_id = Uuid::new_v4();

        // A panic in an earlier request cannot leave a half-applied write:
        // transactions revert on drop. The catalog stays usable.
        let mut catalog = self.catalog.lock().unwrap_or_else(PoisonError::into_inner);

        let (op, result) = if catalog.is_halted() {
            ("refused", Err(ApiError::store_halted()))
        } else {
            match Request::parse(json_request) {
                Ok(request) => (request.op(), execute(&mut catalog, request)),
                Err(e) => ("unparsed", Err(e)),
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(data) => {
                info!(
                    event = %Event::RequestComplete,
                    %request_id,
                    op,
                    elapsed_ms,
                    "request complete"
                );
                Response::success(data)
            }
            Err(e) => {
                if e.is_fatal() {
                    error!(
                        event = %Event::StoreHalted,
                        %request_id,
                        op,
                        code = e.code(),
                        error = e.message(),
                        "store closed to writes; restart to recover"
                    );
                } else if e.is_server_error() {
                    warn!(
                        event = %Event::RequestRejected,
                        %request_id,
                        op,
                        code = e.code(),
                        error = e.message(),
                        elapsed_ms,
                        "request failed"
                    );
                } else {
                    info!(
                        event = %Event::RequestRejected,
                        %request_id,
                        op,
                        code = e.code(),
                        error = e.message(),
                        elapsed_ms,
                        "request rejected"
                    );
                }
                Response::error(&e)
            }
        }
    }

    pub fn is_halted(&self) -> bool {
        self.catalog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_halted()
    }

    /// Releases the catalog, e.g. to compact after serving.
    pub fn into_catalog(self) -> Catalog {
        self.catalog
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn execute(catalog: &mut Catalog, request: Request) -> ApiResult<Value> {
    match request {
        Request::DefineAttribute(input) => encode(catalog.define_attribute(input)?),
        Request::GetAttribute(reference) => encode(catalog.get_attribute(&reference)?),
        Request::ListAttributes { active_only } => encode(catalog.list_attributes(active_only)),
        Request::UpdateAttribute { id, patch } => encode(catalog.update_attribute(id, patch)?),
        Request::DeleteAttribute { id } => encode(catalog.delete_attribute(id)?),

        Request::DefineCategory(input) => encode(catalog.define_category(input)?),
        Request::GetCategory { id } => encode(catalog.get_category(id)?),
        Request::ListCategories { include_attributes } => {
            encode(catalog.list_categories(include_attributes))
        }
        Request::UpdateCategory { id, patch } => encode(catalog.update_category(id, patch)?),
        Request::DeactivateCategory { id } => encode(catalog.deactivate_category(id)?),

        Request::BindAttribute {
            category_id,
            binding,
        } => encode(catalog.bind_attribute(category_id, binding)?),
        Request::ListBindings { category_id } => encode(catalog.list_bindings(category_id)?),
        Request::UpdateBinding {
            category_id,
            attribute_id,
            patch,
        } => encode(catalog.update_binding(category_id, attribute_id, patch)?),
        Request::UnbindAttribute {
            category_id,
            attribute_id,
            force,
        } => encode(catalog.unbind_attribute(category_id, attribute_id, force)?),

        Request::CreateProduct(input) => encode(catalog.create_product(input)?),
        Request::GetProduct { id } => encode(catalog.get_product(id)?),
        Request::ListProducts(filter) => encode(catalog.list_products(&filter)),
        Request::UpdateProduct { id, patch } => encode(catalog.update_product(id, patch)?),
        Request::DeactivateProduct { id } => encode(catalog.deactivate_product(id)?),

        Request::Compact => encode(catalog.compact()?),
    }
}

fn encode<T: Serialize>(data: T) -> ApiResult<Value> {
    serde_json::to_value(data).map_err(ApiError::encoding)
}

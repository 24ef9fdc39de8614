use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::query::ListQuery;
use crate::dispatcher::RequestDispatcher;
use crate::error::DispatchError;
use crate::request::RequestOptions;

/// CRUD calls for one REST collection.
///
/// Writes are wrapped in the collection's envelope, e.g. `{"tag": {...}}`.
#[derive(Clone, Copy)]
pub struct Resource<'a> {
    dispatcher: &'a RequestDispatcher,
    collection: &'static str,
    envelope: &'static str,
}

impl<'a> Resource<'a> {
    pub fn new(
        dispatcher: &'a RequestDispatcher,
        collection: &'static str,
        envelope: &'static str,
    ) -> Self {
        Self {
            dispatcher,
            collection,
            envelope,
        }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    pub fn envelope(&self) -> &'static str {
        self.envelope
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection, id)
    }

    fn wrap<T: Serialize>(&self, fields: &T) -> Result<Value, DispatchError> {
        let inner = serde_json::to_value(fields)
            .map_err(|e| DispatchError::InvalidRequest(format!("serialize {}: {e}", self.envelope)))?;
        let mut outer = Map::new();
        outer.insert(self.envelope.to_string(), inner);
        Ok(Value::Object(outer))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Value, DispatchError> {
        self.dispatcher
            .dispatch(RequestOptions::get(self.collection).with_params(query.to_params()))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Value, DispatchError> {
        self.dispatcher
            .dispatch(RequestOptions::get(self.item_url(id)))
            .await
    }

    pub async fn create<T: Serialize>(&self, fields: &T) -> Result<Value, DispatchError> {
        let data = self.wrap(fields)?;
        self.dispatcher
            .dispatch(RequestOptions::post(self.collection).with_data(data))
            .await
    }

    pub async fn update<T: Serialize>(&self, id: &str, fields: &T) -> Result<Value, DispatchError> {
        let data = self.wrap(fields)?;
        self.dispatcher
            .dispatch(RequestOptions::put(self.item_url(id)).with_data(data))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Value, DispatchError> {
        self.dispatcher
            .dispatch(RequestOptions::delete(self.item_url(id)))
            .await
    }
}

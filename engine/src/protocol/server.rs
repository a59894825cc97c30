//! Request routing for the synchronized surface.
//!
//! The server owns an [`EncounterStore`] and is the source of truth for
//! every roster, including which combatant is active. Each mutating route
//! answers with the fragment of the committed state.

use std::time::Instant;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use super::http::{HttpRequest, HttpResponse, Method};
use super::render;
use super::request::{
    decode, AddEnemy, Reorder, RequestError, SaveCharacter, SelectCharacter, SelectEncounter,
};
use crate::roster::Combatant;
use crate::store::EncounterStore;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid request method")]
    MethodNotAllowed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    BadRequest(#[from] RequestError),

    #[error("index out of range: {from} -> {to} (roster has {len})")]
    IndexOutOfRange { from: usize, to: usize, len: usize },
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::MethodNotAllowed => 405,
            ServerError::NotFound(_) => 404,
            ServerError::BadRequest(_) | ServerError::IndexOutOfRange { .. } => 400,
        }
    }
}

fn expect_method(req: &HttpRequest, method: Method) -> Result<(), ServerError> {
    if req.method == method {
        Ok(())
    } else {
        Err(ServerError::MethodNotAllowed)
    }
}

#[derive(Debug)]
pub struct Server {
    store: EncounterStore,
    search_limit: usize,
}

impl Server {
    pub fn new(store: EncounterStore, search_limit: usize) -> Self {
        Server {
            store,
            search_limit,
        }
    }

    pub fn store(&self) -> &EncounterStore {
        &self.store
    }

    pub fn set_search_limit(&mut self, limit: usize) {
        self.search_limit = limit;
    }

    /// Routes one request and logs its outcome.
    pub fn handle(&mut self, req: &HttpRequest) -> HttpResponse {
        let start = Instant::now();
        let response = match self.route(req) {
            Ok(response) => response,
            Err(error) => {
                warn!(method = %req.method, path = %req.path, error = %error, "request_failed");
                HttpResponse::error(error.status(), error.to_string())
            }
        };
        info!(
            method = %req.method,
            path = %req.path,
            status = response.status,
            elapsed_us = start.elapsed().as_micros() as u64,
            "request_completed"
        );
        response
    }

    fn route(&mut self, req: &HttpRequest) -> Result<HttpResponse, ServerError> {
        let encounter = self.store.current();
        match req.path.as_str() {
            "/characters" => {
                expect_method(req, Method::Get)?;
                Ok(self.roster_response())
            }
            "/characters.json" => {
                expect_method(req, Method::Get)?;
                let roster = self.store.current_roster();
                Ok(HttpResponse::json(&json!(roster)))
            }
            "/encounters" => {
                expect_method(req, Method::Get)?;
                Ok(HttpResponse::html(render::encounter_list_fragment(
                    self.store.encounters(),
                    encounter,
                )))
            }
            "/select-encounter" => {
                expect_method(req, Method::Post)?;
                let body: SelectEncounter = decode(&req.body)?;
                self.store.switch_encounter(body.id);
                Ok(self.roster_response())
            }
            "/select-character" => {
                expect_method(req, Method::Post)?;
                let body: SelectCharacter = decode(&req.body)?;
                self.store.set_active(encounter, body.id);
                Ok(self.roster_response())
            }
            "/next" => {
                expect_method(req, Method::Post)?;
                self.store.advance_turn(encounter);
                Ok(self.roster_response())
            }
            "/sort" => {
                expect_method(req, Method::Post)?;
                self.store.sort_by_initiative(encounter);
                Ok(self.roster_response())
            }
            "/add-character" => {
                expect_method(req, Method::Post)?;
                self.store.add_combatant(encounter);
                Ok(self.roster_response())
            }
            "/add-enemy" => {
                expect_method(req, Method::Post)?;
                let body: AddEnemy = decode(&req.body)?;
                self.store.add_enemy_clone(encounter, body.template_id);
                Ok(self.roster_response())
            }
            "/save-character" => {
                expect_method(req, Method::Post)?;
                let body: SaveCharacter = decode(&req.body)?;
                let saved = self.save(body)?;
                Ok(HttpResponse::html(render::row_fragment(&saved)))
            }
            "/reorder" => {
                expect_method(req, Method::Post)?;
                let body: Reorder = decode(&req.body)?;
                let target = body.encounter_id.unwrap_or(encounter);
                let Some(owner) = self.store.state().encounter(target) else {
                    return Err(ServerError::NotFound(format!("encounter {target}")));
                };
                let len = owner.roster.len();
                if body.old_index >= len || body.new_index >= len {
                    return Err(ServerError::IndexOutOfRange {
                        from: body.old_index,
                        to: body.new_index,
                        len,
                    });
                }
                self.store.reorder(target, body.old_index, body.new_index);
                Ok(HttpResponse::json(&json!({ "status": "success" })))
            }
            "/search-characters" => {
                expect_method(req, Method::Get)?;
                let query = req.query_param("q").unwrap_or("");
                let found = self.store.search_templates(query, self.search_limit);
                Ok(HttpResponse::html(render::search_results_fragment(&found)))
            }
            other => Err(ServerError::NotFound(other.to_string())),
        }
    }

    fn roster_response(&self) -> HttpResponse {
        HttpResponse::html(render::roster_fragment(&self.store.current_roster()))
    }

    /// Creates (id 0) or replaces the stats of a combatant in the current
    /// encounter. Active flag and owner are kept.
    fn save(&mut self, body: SaveCharacter) -> Result<Combatant, ServerError> {
        body.validate()?;
        let encounter = self.store.current();
        let id = if body.is_new() {
            let roster = self.store.add_combatant(encounter);
            match roster.last() {
                Some(created) => created.id,
                None => return Err(ServerError::NotFound(format!("encounter {encounter}"))),
            }
        } else {
            if !self.store.current_roster().contains(body.id) {
                return Err(ServerError::NotFound(format!("character {}", body.id)));
            }
            body.id
        };
        let mut roster = self.store.current_roster();
        for update in body.updates() {
            roster = self.store.update_field(encounter, id, update);
        }
        roster
            .find(id)
            .cloned()
            .ok_or_else(|| ServerError::NotFound(format!("character {id}")))
    }
}

//! WASM bindings for the browser renderer

#![cfg(feature = "wasm")]

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::StoreError;
use crate::strategy::describe_difficulty;
use crate::{Clock, Difficulty, EngineConfig, MatchEngine, RecordStore};

/// `Date.now()` as a clock
struct JsClock;

impl Clock for JsClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Best record kept in `window.localStorage`
struct LocalStorageStore;

impl LocalStorageStore {
    fn storage() -> Result<JsValue, StoreError> {
        let storage = Reflect::get(&js_sys::global(), &JsValue::from_str("localStorage"))
            .map_err(|_| StoreError::Unavailable("localStorage is not accessible".into()))?;
        if storage.is_undefined() || storage.is_null() {
            return Err(StoreError::Unavailable("localStorage is not available".into()));
        }
        Ok(storage)
    }

    fn call(method: &str, args: &Array) -> Result<JsValue, StoreError> {
        let storage = Self::storage()?;
        let func: Function = Reflect::get(&storage, &JsValue::from_str(method))
            .ok()
            .and_then(|f| f.dyn_into().ok())
            .ok_or_else(|| StoreError::Unavailable(format!("localStorage.{} missing", method)))?;
        func.apply(&storage, args)
            .map_err(|e| StoreError::Unavailable(format!("localStorage.{} failed: {:?}", method, e)))
    }
}

impl RecordStore for LocalStorageStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = Self::call("getItem", &Array::of1(&JsValue::from_str(key)))?;
        Ok(value.as_string())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::call("setItem", &Array::of2(&JsValue::from_str(key), &JsValue::from_str(value)))?;
        Ok(())
    }
}

/// One play session, driven by the page
#[wasm_bindgen]
pub struct WasmMatch {
    engine: MatchEngine,
}

#[wasm_bindgen]
impl WasmMatch {
    /// Create a session. `config_json` is an optional JSON `EngineConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmMatch, JsError> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json)
                .map_err(|e| JsError::new(&format!("Invalid config: {}", e)))?,
            None => EngineConfig::default(),
        };
        let engine = MatchEngine::new(config, Box::new(JsClock), Box::new(LocalStorageStore));
        Ok(WasmMatch { engine })
    }

    /// Current state; safe to call from a display timer
    pub fn snapshot(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(&self.engine.snapshot())
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Lock in "rock", "paper" or "scissor". Returns the new snapshot.
    pub fn submit_human_move(&mut self, human: &str) -> Result<JsValue, JsError> {
        self.engine.submit_human_move_str(human)?;
        self.snapshot()
    }

    /// Resolve now instead of waiting for the reveal delay
    pub fn resolve(&mut self) -> Result<JsValue, JsError> {
        let report = self.engine.resolve()?;
        serde_wasm_bindgen::to_value(&report)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    pub fn arm_shield(&mut self) -> bool {
        self.engine.arm_shield()
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<(), JsError> {
        let difficulty: Difficulty = difficulty.parse()?;
        self.engine.set_difficulty(difficulty);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }

    /// Fire due continuations; returns how many fired
    pub fn run_pending(&mut self) -> u32 {
        self.engine.run_pending() as u32
    }

    /// Milliseconds until `run_pending` has work, if any is scheduled
    pub fn next_due_in_ms(&self) -> Option<f64> {
        self.engine.next_due_in_ms().map(|ms| ms as f64)
    }
}

/// Get human-readable description of a difficulty level
#[wasm_bindgen]
pub fn get_difficulty_description(difficulty: &str) -> Result<String, JsError> {
    let difficulty: Difficulty = difficulty
        .parse()
        .map_err(|e| JsError::new(&format!("Invalid difficulty: {}", e)))?;
    Ok(describe_difficulty(difficulty))
}

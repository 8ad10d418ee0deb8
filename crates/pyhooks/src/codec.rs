//! Request and result envelopes.
//!
//! A call's keyword arguments are written to `input.json` in a per-call
//! control directory before the driver is spawned; the driver answers in
//! `output.json`. The directory is removed when the [`ControlDir`] drops, on
//! every exit path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EnvelopeError, HookError, HookResult};

/// File the caller writes the request to.
pub const INPUT_FILE: &str = "input.json";

/// File the driver writes the result to.
pub const OUTPUT_FILE: &str = "output.json";

/// Scoped temp directory holding the envelopes of one call.
#[derive(Debug)]
pub struct ControlDir {
    dir: tempfile::TempDir,
}

impl ControlDir {
    /// Creates a fresh control directory.
    pub fn new() -> HookResult<Self> {
        let dir = tempfile::Builder::new().prefix("pyhooks-").tempdir()?;
        Ok(Self { dir })
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the request file path.
    pub fn input_path(&self) -> PathBuf {
        self.path().join(INPUT_FILE)
    }

    /// Returns the result file path.
    pub fn output_path(&self) -> PathBuf {
        self.path().join(OUTPUT_FILE)
    }

    /// Writes the request envelope.
    pub fn encode(&self, request: &CallRequest) -> HookResult<()> {
        let path = self.input_path();
        let json = serde_json::to_vec(request)
            .map_err(|e| HookError::invalid_argument("kwargs", e))?;
        fs::write(&path, json).map_err(|source| EnvelopeError::Write { path, source })?;
        Ok(())
    }

    /// Reads the result envelope.
    pub fn decode(&self) -> Result<HookOutcome, EnvelopeError> {
        let path = self.output_path();
        if !path.exists() {
            return Err(EnvelopeError::Missing { path });
        }
        let content =
            fs::read_to_string(&path).map_err(|source| EnvelopeError::Read { path, source })?;
        let document: Value = serde_json::from_str(&content).map_err(EnvelopeError::Parse)?;
        HookOutcome::from_document(document)
    }
}

/// Backend settings passed through from the frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSettings(Map<String, Value>);

impl ConfigSettings {
    /// Creates empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from any value that serializes to a JSON object.
    pub fn from_serializable<T: Serialize>(value: &T) -> HookResult<Self> {
        match to_json("config_settings", value)? {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(HookError::invalid_argument(
                "config_settings",
                format!("expected a mapping, got {other}"),
            )),
        }
    }

    /// Adds one setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the setting stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if no settings are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ConfigSettings {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConfigSettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The request envelope: `{"kwargs": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallRequest {
    kwargs: Map<String, Value>,
}

impl CallRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a keyword argument, failing if it is not JSON-representable.
    pub fn arg<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> HookResult<Self> {
        let value = to_json(name, value)?;
        self.kwargs.insert(name.to_string(), value);
        Ok(self)
    }

    /// Adds a filesystem path argument.
    ///
    /// The path must be valid UTF-8 to cross the boundary as JSON.
    pub fn path_arg(self, name: &str, path: &Path) -> HookResult<Self> {
        let text = path
            .to_str()
            .ok_or_else(|| HookError::invalid_argument(name, "path is not valid UTF-8"))?;
        self.arg(name, text)
    }

    /// Adds an optional path argument, encoding `None` as `null`.
    pub fn optional_path_arg(self, name: &str, path: Option<&Path>) -> HookResult<Self> {
        match path {
            Some(path) => self.path_arg(name, path),
            None => self.arg(name, &Value::Null),
        }
    }

    /// Returns the encoded keyword arguments.
    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }
}

fn to_json<T: Serialize + ?Sized>(name: &str, value: &T) -> HookResult<Value> {
    let value = serde_json::to_value(value).map_err(|e| HookError::invalid_argument(name, e))?;
    Ok(value)
}

/// The decoded result envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// The hook returned a value.
    Returned(Value),
    /// The backend module could not be imported.
    BackendUnavailable { traceback: String },
    /// The backend was loaded from outside its declared backend path.
    BackendInvalid { message: String },
    /// The backend does not define the hook and it has no default.
    HookMissing,
    /// The backend refused the operation.
    Unsupported { message: Option<String> },
    /// The hook raised.
    Failed { traceback: String },
}

impl HookOutcome {
    /// Classifies a result document.
    ///
    /// Each state's companion field must have the type the driver writes;
    /// anything else is rejected rather than defaulted.
    pub fn from_document(document: Value) -> Result<Self, EnvelopeError> {
        let mut map = match document {
            Value::Object(map) => map,
            other => return Err(EnvelopeError::Unrecognized(other.to_string())),
        };

        let flag = |map: &Map<String, Value>, key: &str| {
            map.get(key).and_then(Value::as_bool).unwrap_or(false)
        };
        let text = |map: &Map<String, Value>, key: &str| match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        let outcome = if flag(&map, "unsupported") {
            match map.get("message") {
                None | Some(Value::Null) => Some(HookOutcome::Unsupported { message: None }),
                Some(Value::String(message)) => Some(HookOutcome::Unsupported {
                    message: Some(message.clone()),
                }),
                Some(_) => None,
            }
        } else if flag(&map, "backend_invalid") {
            text(&map, "backend_error").map(|message| HookOutcome::BackendInvalid { message })
        } else if flag(&map, "no_backend") {
            text(&map, "traceback").map(|traceback| HookOutcome::BackendUnavailable { traceback })
        } else if flag(&map, "hook_missing") {
            Some(HookOutcome::HookMissing)
        } else if let Some(value) = map.remove("return_val") {
            Some(HookOutcome::Returned(value))
        } else {
            text(&map, "traceback").map(|traceback| HookOutcome::Failed { traceback })
        };

        outcome.ok_or_else(|| EnvelopeError::Unrecognized(Value::Object(map).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;

    fn outcome(document: Value) -> HookOutcome {
        HookOutcome::from_document(document).unwrap()
    }

    #[test]
    fn test_classifies_every_envelope() {
        assert_eq!(
            outcome(json!({"return_val": ["wheel"]})),
            HookOutcome::Returned(json!(["wheel"]))
        );
        assert_eq!(
            outcome(json!({"return_val": null})),
            HookOutcome::Returned(Value::Null)
        );
        assert_eq!(
            outcome(json!({"no_backend": true, "traceback": "ImportError"})),
            HookOutcome::BackendUnavailable {
                traceback: "ImportError".to_string()
            }
        );
        assert_eq!(
            outcome(json!({"backend_invalid": true, "backend_error": "outside"})),
            HookOutcome::BackendInvalid {
                message: "outside".to_string()
            }
        );
        assert_eq!(outcome(json!({"hook_missing": true})), HookOutcome::HookMissing);
        assert_eq!(
            outcome(json!({"unsupported": true, "message": null})),
            HookOutcome::Unsupported { message: None }
        );
        assert_eq!(
            outcome(json!({"unsupported": true, "message": "editable only"})),
            HookOutcome::Unsupported {
                message: Some("editable only".to_string())
            }
        );
        assert_eq!(
            outcome(json!({"traceback": "Traceback ..."})),
            HookOutcome::Failed {
                traceback: "Traceback ...".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        for document in [
            json!([]),
            json!("ok"),
            json!({}),
            json!({"hook_missing": false}),
            json!({"unsupported": true, "message": 5}),
            json!({"no_backend": true}),
            json!({"no_backend": true, "traceback": ["ImportError"]}),
            json!({"backend_invalid": true}),
            json!({"traceback": null}),
        ] {
            assert!(matches!(
                HookOutcome::from_document(document),
                Err(EnvelopeError::Unrecognized(_))
            ));
        }
    }

    #[test]
    fn test_request_document_shape() {
        let request = CallRequest::new()
            .arg("config_settings", &ConfigSettings::new().with("debug", true))
            .unwrap()
            .optional_path_arg("metadata_directory", None)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"kwargs": {"config_settings": {"debug": true}, "metadata_directory": null}})
        );
    }

    #[test]
    fn test_non_json_arguments_fail_fast() {
        let mut bad = HashMap::new();
        bad.insert((1, 2), "tuple keys");
        let err = CallRequest::new().arg("config_settings", &bad).unwrap_err();
        assert!(matches!(err, HookError::InvalidArgument { ref name, .. } if name == "config_settings"));

        let err = ConfigSettings::from_serializable(&vec!["not", "a", "map"]).unwrap_err();
        assert!(matches!(err, HookError::InvalidArgument { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_fails_fast() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/tmp/\xff"));
        let err = CallRequest::new().path_arg("wheel_directory", path).unwrap_err();
        assert!(matches!(err, HookError::InvalidArgument { .. }));
    }

    #[test]
    fn test_return_value_survives_the_boundary() {
        let dir = ControlDir::new().unwrap();
        let value = json!({"name": "pkg1", "n": [1, 2.5, -3], "ok": true, "none": null});
        fs::write(
            dir.output_path(),
            serde_json::to_string(&json!({"return_val": value})).unwrap(),
        )
        .unwrap();
        assert_eq!(dir.decode().unwrap(), HookOutcome::Returned(value));
    }

    #[test]
    fn test_decode_missing_and_garbage() {
        let dir = ControlDir::new().unwrap();
        assert!(matches!(dir.decode(), Err(EnvelopeError::Missing { .. })));

        fs::write(dir.output_path(), "{not json").unwrap();
        assert!(matches!(dir.decode(), Err(EnvelopeError::Parse(_))));
    }

    #[test]
    fn test_control_dir_is_removed_on_drop() {
        let dir = ControlDir::new().unwrap();
        dir.encode(&CallRequest::new()).unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.join(INPUT_FILE).exists());
        drop(dir);
        assert!(!path.exists());
    }
}

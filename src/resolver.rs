//! Applies explicitly set command-line flags on top of the other sources.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use tracing::trace;

use crate::decode::{decode, decode_text, DecodeError};
use crate::descriptor::{Descriptors, FieldDescriptor};
use crate::error::{ConfError, Result};
use crate::schema::FieldKind;
use crate::sources::FlagRegistry;
use crate::store::ResolvedStore;


/// Overwrite the store with every flag that was given on the command line.
///
/// Flags that only carry their declared default are left alone, so
/// environment and file values keep precedence over them.
/// Returns the number of fields taken from flags.
pub fn apply_flags(
    descriptors: &Descriptors,
    flags: &FlagRegistry,
    store: &mut ResolvedStore,
) -> Result<usize> {
    let mut applied = 0;

    for descriptor in descriptors {
        if !flags.is_set(&descriptor.name) {
            continue;
        }

        let raw_values = flags.raw_values(&descriptor.name);
        let value = flag_value(descriptor, &raw_values)?;

        trace!(path = %descriptor.path, flag = %descriptor.name, "Value taken from flag.");
        store.set(&descriptor.path, value);
        applied += 1;
    }

    Ok(applied)
}


fn flag_value(descriptor: &FieldDescriptor, raw_values: &[String]) -> Result<Value> {
    let unmarshal = |source: DecodeError| ConfError::Unmarshal {
        path: descriptor.path.clone(),
        origin: format!("flag --{}", descriptor.name),
        source,
    };

    // A repeated scalar flag keeps its last occurrence.
    let last = raw_values.last().map(String::as_str).unwrap_or_default();

    match descriptor.kind {
        FieldKind::StringList => decode(descriptor.kind, &json!(raw_values)).map_err(unmarshal),
        FieldKind::Bytes => {
            let bytes = BASE64
                .decode(last)
                .map_err(|source| ConfError::Base64 {
                    flag: descriptor.name.clone(),
                    source,
                })?;

            Ok(json!(bytes))
        }
        FieldKind::Bool => match parse_boolish(last) {
            Some(boolean) => Ok(Value::Bool(boolean)),
            None => decode_text(descriptor.kind, last).map_err(unmarshal),
        },
        kind => decode_text(kind, last).map_err(unmarshal),
    }
}

/// The spellings clap's boolish parser accepts.
fn parse_boolish(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::schema::{Field, Schema};
    use crate::traits::Configurable;

    struct Local;

    impl Configurable for Local {
        fn schema() -> Schema {
            Schema::builder("Local")
                .field(Field::of::<String>("id").flag("id"))
                .field(Field::of::<String>("overridden_by_arg"))
                .field(Field::of::<Vec<u8>>("bytes"))
                .field(Field::of::<Vec<String>>("slice"))
                .field(Field::of::<bool>("debug"))
                .field(Field::of::<u32>("port").default("8080"))
                .build()
        }
    }

    fn resolve(arguments: &[&str]) -> Result<ResolvedStore> {
        let descriptors = Descriptors::of::<Local>()?;
        let mut store = ResolvedStore::with_defaults(&descriptors)?;
        let mut flags = FlagRegistry::new(arguments.iter().copied());

        bind(&descriptors, &mut flags, None)?;
        flags.parse()?;
        store.set("overridden_by_arg", json!("fromFile"));

        apply_flags(&descriptors, &flags, &mut store)?;
        Ok(store)
    }

    #[test]
    fn explicit_flags_overwrite_stored_values() {
        let store = resolve(&["app", "--id", "10", "--overridden_by_arg", "fromArg"]).unwrap();

        assert_eq!(store.get("id"), Some(&json!("10")));
        assert_eq!(store.get("overridden_by_arg"), Some(&json!("fromArg")));
    }

    #[test]
    fn unset_flags_leave_stored_values_alone() {
        let store = resolve(&["app"]).unwrap();

        assert_eq!(store.get("overridden_by_arg"), Some(&json!("fromFile")));
        assert_eq!(store.get("port"), Some(&json!(8080)));
    }

    #[test]
    fn byte_flags_are_base64_decoded() {
        let store = resolve(&["app", "--bytes", "dGVzdA=="]).unwrap();
        assert_eq!(store.get("bytes"), Some(&json!(b"test".to_vec())));

        assert!(matches!(
            resolve(&["app", "--bytes", "%%%"]),
            Err(ConfError::Base64 { flag, .. }) if flag == "bytes"
        ));
    }

    #[test]
    fn list_and_boolean_flags() {
        let store = resolve(&["app", "--slice", "a", "--slice", "b", "--debug", "yes"]).unwrap();

        assert_eq!(store.get("slice"), Some(&json!(["a", "b"])));
        assert_eq!(store.get("debug"), Some(&json!(true)));
    }
}

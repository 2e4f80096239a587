/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Carbide Telemetry Engineering. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/decode.rs
// Pure payload decoder: raw bytes -> tagged DecodedPayload. Never fails;
// unparseable input classifies as Undecodable rather than propagating an
// error, since downstream components only care about the three outcomes.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    Number(f64),
    Passthrough(Value),
    Undecodable,
}

/// Decodes a raw MQTT payload into a sample value, a structured
/// passthrough, or Undecodable. NaN and infinite floats are always
/// classified as Undecodable -- they can't usefully cross a threshold.
pub fn decode(bytes: &[u8]) -> DecodedPayload {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => return DecodedPayload::Undecodable,
    };

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if let Some(obj) = value.as_object() {
            if let Some(message) = obj.get("message") {
                if let Some(nested) = message.as_object().and_then(|m| m.get("message")) {
                    return match as_native_number(nested) {
                        Some(n) => DecodedPayload::Number(n),
                        None => DecodedPayload::Passthrough(nested.clone()),
                    };
                }
                return match coerce_number(message) {
                    Some(n) => DecodedPayload::Number(n),
                    None => DecodedPayload::Passthrough(message.clone()),
                };
            }
            return match coerce_number(&value) {
                Some(n) => DecodedPayload::Number(n),
                None => DecodedPayload::Undecodable,
            };
        }
        return match coerce_number(&value) {
            Some(n) => DecodedPayload::Number(n),
            None => DecodedPayload::Undecodable,
        };
    }

    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => DecodedPayload::Number(n),
        _ => DecodedPayload::Undecodable,
    }
}

fn as_native_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(_) => as_native_number(value),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_numeric_string() {
        assert_eq!(decode(b"42"), DecodedPayload::Number(42.0));
        assert_eq!(decode(b"  3.5 "), DecodedPayload::Number(3.5));
    }

    #[test]
    fn non_numeric_string_is_undecodable() {
        assert_eq!(decode(b"hello"), DecodedPayload::Undecodable);
    }

    #[test]
    fn nan_string_is_undecodable() {
        assert_eq!(decode(b"NaN"), DecodedPayload::Undecodable);
        assert_eq!(decode(b"inf"), DecodedPayload::Undecodable);
    }

    #[test]
    fn nested_message_message_numeric() {
        let payload = json!({"message": {"message": 5}}).to_string();
        assert_eq!(decode(payload.as_bytes()), DecodedPayload::Number(5.0));
    }

    #[test]
    fn nested_message_message_passthrough() {
        let payload = json!({"message": {"message": "hello"}}).to_string();
        assert_eq!(
            decode(payload.as_bytes()),
            DecodedPayload::Passthrough(json!("hello"))
        );
    }

    #[test]
    fn message_field_numeric_string_coerces() {
        let payload = json!({"message": "42"}).to_string();
        assert_eq!(decode(payload.as_bytes()), DecodedPayload::Number(42.0));
    }

    #[test]
    fn message_field_non_numeric_passthrough() {
        let payload = json!({"message": "not-a-number"}).to_string();
        assert_eq!(
            decode(payload.as_bytes()),
            DecodedPayload::Passthrough(json!("not-a-number"))
        );
    }

    #[test]
    fn object_without_message_field_is_undecodable() {
        let payload = json!({"foo": "bar"}).to_string();
        assert_eq!(decode(payload.as_bytes()), DecodedPayload::Undecodable);
    }

    #[test]
    fn bare_json_number() {
        assert_eq!(decode(b"7.5"), DecodedPayload::Number(7.5));
    }
}

//! 属性值类型转换

use crate::runtime::object::Value;
use crate::runtime::registry::{PropertyType, TypeKind};

/// 把值转换成属性声明的类型
pub fn coerce(value: Value, ty: &PropertyType) -> Result<Value, String> {
    match (value, ty) {
        (Value::Null, _) => Ok(Value::Null),
        (v, PropertyType::Any) => Ok(v),

        (Value::String(s), ty) => from_text(s, ty),

        (Value::Int(i), PropertyType::Int) => Ok(Value::Int(i)),
        (Value::Int(i), PropertyType::Float) => Ok(Value::Float(i as f64)),
        (Value::Float(f), PropertyType::Float) => Ok(Value::Float(f)),
        (Value::Bool(b), PropertyType::Bool) => Ok(Value::Bool(b)),
        (Value::Int(i), PropertyType::String) => Ok(Value::String(i.to_string())),
        (Value::Float(f), PropertyType::String) => Ok(Value::String(f.to_string())),
        (Value::Bool(b), PropertyType::String) => Ok(Value::String(b.to_string())),
        (Value::Type(t), PropertyType::Object(None)) => Ok(Value::Type(t)),

        (Value::Object(o), PropertyType::Object(constraint)) => match constraint {
            Some(name) if !o.descriptor().is_assignable_to(name) => Err(format!(
                "{} is not assignable to {}",
                o.type_name().local_name,
                name
            )),
            _ => Ok(Value::Object(o)),
        },
        (Value::List(items), PropertyType::Collection) => Ok(Value::List(items)),
        (Value::Object(o), PropertyType::Collection) if o.kind() == TypeKind::Collection => {
            Ok(Value::Object(o))
        }
        (Value::Object(o), PropertyType::Dictionary) if o.kind() == TypeKind::ResourceDictionary => {
            Ok(Value::Object(o))
        }

        (v, ty) => Err(format!("cannot convert {} to {}", v.kind_name(), describe(ty))),
    }
}

fn from_text(s: String, ty: &PropertyType) -> Result<Value, String> {
    match ty {
        PropertyType::String | PropertyType::Object(_) | PropertyType::Any => Ok(Value::String(s)),
        PropertyType::Bool => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a bool", s)),
        },
        PropertyType::Int => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("'{}' is not an int", s)),
        PropertyType::Float => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("'{}' is not a number", s)),
        PropertyType::Enum(members) => {
            let trimmed = s.trim();
            if members.iter().any(|m| m == trimmed) {
                Ok(Value::String(trimmed.to_string()))
            } else {
                Err(format!("'{}' is not one of {}", s, members.join("|")))
            }
        }
        PropertyType::Collection | PropertyType::Dictionary => {
            Err(format!("cannot convert text '{}' to {}", s, describe(ty)))
        }
    }
}

fn describe(ty: &PropertyType) -> String {
    match ty {
        PropertyType::String => "string".into(),
        PropertyType::Bool => "bool".into(),
        PropertyType::Int => "int".into(),
        PropertyType::Float => "float".into(),
        PropertyType::Enum(m) => format!("enum {}", m.join("|")),
        PropertyType::Object(Some(t)) => t.clone(),
        PropertyType::Object(None) => "object".into(),
        PropertyType::Collection => "collection".into(),
        PropertyType::Dictionary => "dictionary".into(),
        PropertyType::Any => "any".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_coercion() {
        assert_eq!(coerce("True".into(), &PropertyType::Bool), Ok(Value::Bool(true)));
        assert_eq!(coerce(" 42 ".into(), &PropertyType::Int), Ok(Value::Int(42)));
        assert_eq!(coerce("1.5".into(), &PropertyType::Float), Ok(Value::Float(1.5)));
        assert_eq!(coerce("12".into(), &PropertyType::Float), Ok(Value::Float(12.0)));
        assert_eq!(coerce("x".into(), &PropertyType::String), Ok(Value::String("x".into())));

        let orientation = PropertyType::Enum(vec!["Vertical".into(), "Horizontal".into()]);
        assert_eq!(coerce("Horizontal".into(), &orientation), Ok(Value::String("Horizontal".into())));
        assert!(coerce("Diagonal".into(), &orientation).is_err());
        assert!(coerce("yes".into(), &PropertyType::Bool).is_err());
        assert!(coerce("a".into(), &PropertyType::Collection).is_err());
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(coerce(Value::Int(3), &PropertyType::Float), Ok(Value::Float(3.0)));
        assert!(coerce(Value::Float(3.5), &PropertyType::Int).is_err());
        assert_eq!(coerce(Value::Null, &PropertyType::Int), Ok(Value::Null));
        assert_eq!(coerce(Value::Bool(false), &PropertyType::Any), Ok(Value::Bool(false)));
    }
}

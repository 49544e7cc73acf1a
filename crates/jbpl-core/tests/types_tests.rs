use jbpl_core::types::*;
use jbpl_core::value::Value;
use pretty_assertions::assert_eq;
use strum::IntoEnumIterator;

struct NoNames;

impl TypeEnvironment for NoNames {
    fn resolve_alias(&self, _name: &str) -> Option<Type> {
        None
    }

    fn prepro_class_fields(&self, name: &str) -> Option<Vec<(String, Type)>> {
        (name == "Point").then(|| {
            vec![
                ("x".to_string(), Type::I32),
                ("label".to_string(), Type::STRING),
            ]
        })
    }
}

#[test]
fn numeric_widening_follows_declaration_order() {
    let numeric = BuiltinType::iter()
        .filter(|ty| ty.is_numeric())
        .collect::<Vec<_>>();
    for a in &numeric {
        for b in &numeric {
            if a.category() != b.category() {
                continue;
            }
            let expected = b <= a;
            assert_eq!(
                Type::Builtin(*a).is_assignable_from(&Type::Builtin(*b)),
                expected,
                "{} <- {}",
                a,
                b
            );
        }
    }
}

#[test]
fn non_numeric_assignability_is_nominal() {
    assert!(Type::class("a/B").is_assignable_from(&Type::class("a/B")));
    assert!(!Type::class("a/B").is_assignable_from(&Type::class("a/C")));
    assert!(!Type::STRING.is_assignable_from(&Type::I32));
    assert!(Type::OBJECT.is_assignable_from(&Type::STRING));
    let either = Type::intersect([Type::I32, Type::STRING]);
    assert!(either.is_assignable_from(&Type::STRING));
    assert!(!either.is_assignable_from(&Type::BOOL));
}

#[test]
fn commonizer_examples() {
    assert_eq!(common_type(&[Type::I32, Type::I64]), Some(Type::I64));
    assert_eq!(common_type(&[Type::STRING, Type::I32]), None);
    assert_eq!(common_type(&[Type::BOOL, Type::BOOL]), Some(Type::BOOL));
}

#[test]
fn list_matcher_ratings() {
    let call = [Type::I32, Type::I32];
    assert_eq!(compute_rating(&[Type::I32, Type::I32], &call), 4);
    assert_eq!(compute_rating(&[Type::I64, Type::I32], &call), 3);
    assert_eq!(compute_rating(&[Type::STRING], &call), 0);

    let tied = vec![
        TypeList::new(vec![Type::I32, Type::I32], "first"),
        TypeList::new(vec![Type::I32, Type::I32], "second"),
    ];
    let result = match_best(tied, &call).unwrap();
    assert_eq!(result.kind, MatchKind::Ambiguous);
    assert_eq!(result.best.rating, 4);
}

#[test]
fn default_values() {
    assert_eq!(Type::I64.default_value(&NoNames).unwrap(), Value::I64(0));
    assert_eq!(Type::STRING.default_value(&NoNames).unwrap(), Value::from(""));
    assert!(Type::class("a/B").default_value(&NoNames).is_err());
    assert!(Type::intersect([Type::I32, Type::BOOL])
        .default_value(&NoNames)
        .is_err());

    let point = Type::Unresolved("Point".into()).default_value(&NoNames).unwrap();
    let Value::Class(point) = point else {
        panic!("expected a compile-time class instance, got {:?}", point);
    };
    assert_eq!(point.field("x"), Some(&Value::I32(0)));
    assert_eq!(point.field("label"), Some(&Value::from("")));
}

#[test]
fn unresolved_names_go_through_the_environment() {
    assert_eq!(
        Type::Unresolved("Point".into()).resolve(&NoNames).unwrap(),
        Type::PreproClass("Point".into())
    );
    assert!(Type::Unresolved("Missing".into()).resolve(&NoNames).is_err());
}

#[test]
fn only_builtin_class_and_array_types_materialize() {
    assert_eq!(Type::STRING.materialize().unwrap().to_string(), "Ljava/lang/String;");
    assert_eq!(Type::class("a/B").materialize().unwrap().to_string(), "La/B;");
    assert!(Type::range(Type::I32).materialize().is_err());
    assert!(Type::PreproClass("Point".into()).materialize().is_err());
}

use itertools::Itertools;

use super::{Type, TypeCategory};

/// Computes the join of a set of types.
///
/// Types from more than one category never join. Integer and float sets join
/// to their widest member; any other category must contain exactly one
/// distinct type.
pub fn common_type<'t>(types: impl IntoIterator<Item = &'t Type>) -> Option<Type> {
    let unique = types.into_iter().unique().collect::<Vec<_>>();
    let category = unique.iter().map(|ty| ty.category()).all_equal_value().ok()?;
    match category {
        TypeCategory::Integer | TypeCategory::Float => unique
            .into_iter()
            .filter_map(Type::as_builtin)
            .max()
            .map(Type::Builtin),
        _ => unique.into_iter().exactly_one().ok().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_sets_join_to_the_widest_member() {
        assert_eq!(common_type(&[Type::I32, Type::I64]), Some(Type::I64));
        assert_eq!(common_type(&[Type::I8, Type::I16, Type::I8]), Some(Type::I16));
        assert_eq!(common_type(&[Type::F32, Type::F64]), Some(Type::F64));
    }

    #[test]
    fn mixed_categories_do_not_join() {
        assert_eq!(common_type(&[Type::STRING, Type::I32]), None);
        assert_eq!(common_type(&[Type::I32, Type::F32]), None);
        assert_eq!(common_type(&[]), None);
    }

    #[test]
    fn other_categories_need_one_distinct_type() {
        assert_eq!(common_type(&[Type::STRING, Type::STRING]), Some(Type::STRING));
        assert_eq!(
            common_type(&[Type::class("a/B"), Type::class("a/C")]),
            None
        );
    }
}

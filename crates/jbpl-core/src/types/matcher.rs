use super::{Type, TypeConversion};

/// A candidate parameter list together with the item it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeList<D> {
    pub types: Vec<Type>,
    pub data: D,
}

impl<D> TypeList<D> {
    pub fn new(types: Vec<Type>, data: D) -> Self {
        Self { types, data }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatedTypeList<D> {
    pub types: Vec<Type>,
    pub rating: u32,
    pub data: D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Direct,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<D> {
    pub best: RatedTypeList<D>,
    pub kind: MatchKind,
}

impl<D> MatchResult<D> {
    pub fn is_ambiguous(&self) -> bool {
        self.kind == MatchKind::Ambiguous
    }
}

/// Rates how well `arguments` fit `parameters`: 2 per direct match, 1 per
/// coercion, and 0 overall when the lengths differ or any position cannot convert.
pub fn compute_rating(parameters: &[Type], arguments: &[Type]) -> u32 {
    viable_rating(parameters, arguments).unwrap_or(0)
}

fn viable_rating(parameters: &[Type], arguments: &[Type]) -> Option<u32> {
    if parameters.len() != arguments.len() {
        return None;
    }
    parameters
        .iter()
        .zip(arguments)
        .map(|(parameter, argument)| match parameter.conversion_from(argument) {
            TypeConversion::None => None,
            conversion => Some(conversion.rating()),
        })
        .sum()
}

pub fn rate<D>(candidate: TypeList<D>, arguments: &[Type]) -> RatedTypeList<D> {
    RatedTypeList {
        rating: compute_rating(&candidate.types, arguments),
        types: candidate.types,
        data: candidate.data,
    }
}

/// Picks the best-rated viable candidate. Several candidates sharing the top
/// rating yield a result of kind [`MatchKind::Ambiguous`].
///
/// An empty parameter list is viable for an empty argument list even though it rates 0.
pub fn match_best<D>(
    candidates: impl IntoIterator<Item = TypeList<D>>,
    arguments: &[Type],
) -> Option<MatchResult<D>> {
    let mut rated = candidates
        .into_iter()
        .filter_map(|candidate| {
            let rating = viable_rating(&candidate.types, arguments)?;
            (rating > 0 || arguments.is_empty()).then_some(RatedTypeList {
                types: candidate.types,
                rating,
                data: candidate.data,
            })
        })
        .collect::<Vec<_>>();
    rated.sort_by(|a, b| b.rating.cmp(&a.rating));
    let top = rated.first()?.rating;
    let kind = if rated.iter().filter(|list| list.rating == top).count() > 1 {
        MatchKind::Ambiguous
    } else {
        MatchKind::Direct
    };
    let best = rated.into_iter().next()?;
    Some(MatchResult { best, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_follow_conversion_kinds() {
        let call = [Type::I32, Type::I32];
        assert_eq!(compute_rating(&[Type::I32, Type::I32], &call), 4);
        assert_eq!(compute_rating(&[Type::I64, Type::I32], &call), 3);
        assert_eq!(compute_rating(&[Type::STRING], &call), 0);
        assert_eq!(compute_rating(&[Type::I8, Type::I32], &call), 0);
    }

    #[test]
    fn best_candidate_wins() {
        let candidates = vec![
            TypeList::new(vec![Type::I64, Type::I64], "wide"),
            TypeList::new(vec![Type::I32, Type::I32], "exact"),
            TypeList::new(vec![Type::STRING], "string"),
        ];
        let result = match_best(candidates, &[Type::I32, Type::I32]).unwrap();
        assert_eq!(result.best.data, "exact");
        assert_eq!(result.best.rating, 4);
        assert_eq!(result.kind, MatchKind::Direct);
    }

    #[test]
    fn tied_candidates_are_ambiguous() {
        let candidates = vec![
            TypeList::new(vec![Type::I32, Type::I32], 1),
            TypeList::new(vec![Type::I32, Type::I32], 2),
        ];
        let result = match_best(candidates, &[Type::I32, Type::I32]).unwrap();
        assert!(result.is_ambiguous());
    }

    #[test]
    fn no_viable_candidate_yields_none() {
        let candidates = vec![TypeList::new(vec![Type::STRING], ())];
        assert!(match_best(candidates, &[Type::I32]).is_none());
        let empty = vec![TypeList::new(vec![], ())];
        assert!(match_best(empty, &[]).is_some());
    }
}

use support::descriptor::{BaseType, DescriptorError};

/// What the loader has to produce to satisfy a request for a class name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPlan {
    Instance(String),
    ObjectArray(ArrayPlan<String>),
    PrimitiveArray(ArrayPlan<BaseType>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayPlan<C> {
    pub descriptor: String,
    pub dimension: usize,
    pub element: ElementPlan<C>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPlan<C> {
    Component(C),
    Down(Box<ArrayPlan<C>>),
}

impl LoadPlan {
    pub fn name(&self) -> &str {
        match self {
            LoadPlan::Instance(name) => name,
            LoadPlan::ObjectArray(plan) => &plan.descriptor,
            LoadPlan::PrimitiveArray(plan) => &plan.descriptor,
        }
    }
}

/// Arrays may have at most this many dimensions, as in the JVM.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// Classifies a class name or array descriptor.
///
/// Anything not starting with `[` is an instance class name and is passed through untouched.
/// For arrays the element is parsed once, then the plan is built from the innermost dimension
/// outwards, so `[[I` yields a plan for a two dimensional array whose element is the plan for `[I`.
pub fn resolve(descriptor: &str) -> Result<LoadPlan, DescriptorError> {
    let fault = |reason: &str| DescriptorError::new(descriptor, reason);

    if descriptor.is_empty() {
        return Err(fault("empty class name"));
    }

    let element = descriptor.trim_start_matches('[');
    let dimension = descriptor.len() - element.len();
    if dimension == 0 {
        return Ok(LoadPlan::Instance(descriptor.to_string()));
    }

    if dimension > MAX_ARRAY_DIMENSIONS {
        return Err(fault("too many array dimensions"));
    }

    let mut chars = element.chars();
    match chars.next() {
        Some('L') => {
            let Some(component) = chars.as_str().strip_suffix(';') else {
                return Err(fault("unterminated class name"));
            };

            if component.is_empty() {
                return Err(fault("empty class name"));
            }

            if component.contains(';') || component.contains('[') {
                return Err(fault("malformed class name"));
            }

            Ok(LoadPlan::ObjectArray(build(
                descriptor,
                dimension,
                component.to_string(),
            )))
        }
        Some(code) => {
            if !chars.as_str().is_empty() {
                return Err(fault("trailing characters after primitive type"));
            }

            let ty = BaseType::from_code_no_wrap(code)
                .ok_or_else(|| fault("unknown primitive type"))?;

            Ok(LoadPlan::PrimitiveArray(build(descriptor, dimension, ty)))
        }
        None => Err(fault("array without an element type")),
    }
}

fn build<C>(descriptor: &str, dimension: usize, component: C) -> ArrayPlan<C> {
    // descriptor[dimension - n..] is the descriptor of the n dimensional array
    let mut plan = ArrayPlan {
        descriptor: descriptor[dimension - 1..].to_string(),
        dimension: 1,
        element: ElementPlan::Component(component),
    };

    for level in 2..=dimension {
        plan = ArrayPlan {
            descriptor: descriptor[dimension - level..].to_string(),
            dimension: level,
            element: ElementPlan::Down(Box::new(plan)),
        };
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_names_pass_through() {
        assert_eq!(
            resolve("java/lang/String").unwrap(),
            LoadPlan::Instance("java/lang/String".to_string())
        );
    }

    #[test]
    fn primitive_arrays() {
        let LoadPlan::PrimitiveArray(plan) = resolve("[I").unwrap() else {
            panic!("expected a primitive array plan");
        };

        assert_eq!(plan.dimension, 1);
        assert_eq!(plan.element, ElementPlan::Component(BaseType::Int));

        // Small types are kept exact, not widened.
        let LoadPlan::PrimitiveArray(plan) = resolve("[Z").unwrap() else {
            panic!("expected a primitive array plan");
        };
        assert_eq!(plan.element, ElementPlan::Component(BaseType::Boolean));
    }

    #[test]
    fn object_arrays() {
        let LoadPlan::ObjectArray(plan) = resolve("[Ljava/lang/String;").unwrap() else {
            panic!("expected an object array plan");
        };

        assert_eq!(plan.dimension, 1);
        assert_eq!(
            plan.element,
            ElementPlan::Component("java/lang/String".to_string())
        );
    }

    #[test]
    fn nested_arrays_point_one_dimension_down() {
        let LoadPlan::ObjectArray(plan) = resolve("[[Ljava/lang/Object;").unwrap() else {
            panic!("expected an object array plan");
        };

        assert_eq!(plan.dimension, 2);
        let ElementPlan::Down(down) = plan.element else {
            panic!("expected a down plan");
        };
        assert_eq!(down.descriptor, "[Ljava/lang/Object;");
        assert_eq!(down.dimension, 1);

        let LoadPlan::PrimitiveArray(plan) = resolve("[[[D").unwrap() else {
            panic!("expected a primitive array plan");
        };
        assert_eq!(plan.dimension, 3);
        assert_eq!(LoadPlan::PrimitiveArray(plan).name(), "[[[D");
    }

    #[test]
    fn malformed_descriptors() {
        for bad in ["", "[", "[[", "[V", "[Q", "[II", "[L;", "[Ljava/lang/String", "[Lfoo;bar;"] {
            let err = resolve(bad).unwrap_err();
            assert_eq!(err.descriptor, bad);
        }
    }

    #[test]
    fn deepest_legal_array() {
        let descriptor = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        let LoadPlan::PrimitiveArray(plan) = resolve(&descriptor).unwrap() else {
            panic!("expected a primitive array plan");
        };
        assert_eq!(plan.dimension, MAX_ARRAY_DIMENSIONS);
        assert_eq!(plan.descriptor, descriptor);

        let mut depth = 1;
        let mut current = &plan;
        while let ElementPlan::Down(down) = &current.element {
            assert_eq!(down.dimension, current.dimension - 1);
            assert_eq!(down.descriptor, &current.descriptor[1..]);
            current = down.as_ref();
            depth += 1;
        }

        assert_eq!(depth, MAX_ARRAY_DIMENSIONS);
        assert_eq!(current.element, ElementPlan::Component(BaseType::Int));
    }

    #[test]
    fn absurd_nesting_is_rejected() {
        for element in ["I", "Ljava/lang/Object;"] {
            let descriptor = format!("{}{}", "[".repeat(50_000), element);
            let err = resolve(&descriptor).unwrap_err();
            assert_eq!(err.descriptor, descriptor);
            assert!(err.reason.contains("dimensions"), "{}", err.reason);
        }

        let just_over = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS + 1));
        assert!(resolve(&just_over).is_err());
    }
}

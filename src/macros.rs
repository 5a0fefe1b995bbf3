/// Builds a string-keyed [`DsonValue`](crate::DsonValue) from JSON-like syntax.
///
/// Integer literals become `Int32`, float literals `Double`. Any other expression is
/// converted with `DsonValue::from`; wrap negative numbers inside arrays in
/// parentheses.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, DsonValue};
///
/// let value = dson!({
///     "name": "Alice",
///     "age": 30,
///     "scores": [1.5, (-2.0)],
///     "nickname": null
/// });
///
/// let obj = value.as_object().unwrap();
/// assert_eq!(obj.get("age"), Some(&DsonValue::Int32(30)));
/// assert_eq!(obj.get("nickname"), Some(&DsonValue::Null));
/// ```
#[macro_export]
macro_rules! dson {
    (null) => {
        $crate::DsonValue::<::std::string::String>::Null
    };

    (true) => {
        $crate::DsonValue::<::std::string::String>::Bool(true)
    };

    (false) => {
        $crate::DsonValue::<::std::string::String>::Bool(false)
    };

    ([]) => {
        $crate::DsonValue::<::std::string::String>::Array($crate::DsonArray::new())
    };

    ([ $($elem:tt),* $(,)? ]) => {{
        let mut array = $crate::DsonArray::<::std::string::String>::new();
        $(
            // only a header value is rejected, and the macro never produces one
            let _ = array.push($crate::dson!($elem));
        )*
        $crate::DsonValue::Array(array)
    }};

    ({}) => {
        $crate::DsonValue::<::std::string::String>::Object($crate::DsonObject::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::DsonObject::<::std::string::String>::new();
        $(
            let _ = object.insert($key, $crate::dson!($value));
        )*
        $crate::DsonValue::Object(object)
    }};

    ($e:expr) => {
        $crate::DsonValue::<::std::string::String>::from($e)
    };
}

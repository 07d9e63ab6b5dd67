/// Generates builder-style setters for optional request fields.
macro_rules! optional_setters {
    ($($field:ident : $ty:ty),* $(,)?) => {
        $(
            pub fn $field<T>(mut self, $field: T) -> Self
            where
                T: Into<$ty>,
            {
                self.$field = Some($field.into());
                self
            }
        )*
    };
}

pub(crate) use optional_setters;

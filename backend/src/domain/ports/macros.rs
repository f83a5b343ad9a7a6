//! Helper macro for port error enums.
//!
//! Each variant gets a `thiserror` message and a snake_case constructor whose
//! parameters accept anything convertible into the field type.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum StoreError {
            Closed => "store closed",
            Query { message: String } => "query failed: {message}",
            Busy { message: String, retries: u32 } => "busy: {message} after {retries}",
        }
    }

    #[test]
    fn unit_variant_constructor() {
        assert_eq!(StoreError::closed().to_string(), "store closed");
    }

    #[test]
    fn string_fields_accept_str() {
        assert_eq!(StoreError::query("syntax").to_string(), "query failed: syntax");
    }

    #[test]
    fn mixed_fields_keep_their_types() {
        let err = StoreError::busy("locked", 3_u32);
        assert_eq!(
            err,
            StoreError::Busy {
                message: "locked".to_owned(),
                retries: 3
            }
        );
        assert_eq!(err.to_string(), "busy: locked after 3");
    }
}

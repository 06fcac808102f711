#[macro_export]
macro_rules! t {
    ($amount:literal seconds) => {{
        $crate::core::time::Duration::seconds($amount)
    }};
    ($amount:literal minutes) => {{
        $crate::core::time::Duration::minutes($amount)
    }};
    ($amount:literal hours) => {{
        $crate::core::time::Duration::hours($amount)
    }};
    ($amount:literal days) => {{
        $crate::core::time::Duration::days($amount)
    }};
}

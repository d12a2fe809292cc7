use chrono::Utc;

/// A fresh payment session reference, e.g. `CHM-1718000000123-9f2c61ab`. It is generated locally so that the pending
/// record exists before the gateway is contacted.
pub fn new_payment_reference() -> String {
    format!("CHM-{}-{:08x}", Utc::now().timestamp_millis(), rand::random::<u32>())
}

/// A fresh withdrawal reference, e.g. `WD-1718000000123-4be1`.
pub fn new_withdrawal_reference() -> String {
    format!("WD-{}-{:04x}", Utc::now().timestamp_millis(), rand::random::<u16>())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn references_are_unique() {
        let a = new_payment_reference();
        let b = new_payment_reference();
        assert!(a.starts_with("CHM-"));
        assert_ne!(a, b);
        let w = new_withdrawal_reference();
        assert!(w.starts_with("WD-"));
        assert_eq!(w.split('-').count(), 3);
    }
}

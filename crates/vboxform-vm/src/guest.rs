//! Guest property lookups.

use crate::invocation::Invocation;

/// Guest property holding the IPv4 address of the first network adapter.
pub const GUEST_IPV4_PROPERTY: &str = "/VirtualBox/GuestInfo/Net/0/V4/IP";

const VALUE_PREFIX: &str = "Value: ";

/// `guestproperty get <name> /VirtualBox/GuestInfo/Net/0/V4/IP`
pub fn ipv4_query(name: &str) -> Invocation {
    Invocation::new(["guestproperty", "get", name, GUEST_IPV4_PROPERTY])
}

/// Extract the value from `guestproperty get` output.
///
/// VBoxManage prints `Value: <value>` when the property is set and
/// `No value set!` otherwise. Anything without the prefix yields `None`:
/// the guest simply has not reported yet.
pub fn parse_property_value(output: &str) -> Option<&str> {
    output
        .trim()
        .strip_prefix(VALUE_PREFIX)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

use std::fmt;

use bitflags::bitflags;
use lazy_static::lazy_static;

use crate::{
    errors::{AclError, AmResult},
    sys::{WHO_GROUP, WHO_OTHER, WHO_USER},
};

lazy_static! {
    /// The well known world principal that matches every requester
    pub static ref EVERYONE: Sid = Sid::new("S-1-1-0");
}

/// An opaque principal identifier in the target access control model
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let sid = Sid::new("S-1-5-21-500");
/// assert_eq!(sid.id(), "S-1-5-21-500");
/// assert!(!sid.is_everyone());
/// assert!(EVERYONE.is_everyone());
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Sid(String);

impl Sid {
    /// Create a new principal identifier from the given string form
    pub fn new<T: Into<String>>(id: T) -> Self {
        Sid(id.into())
    }

    /// Returns the string form of the identifier
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the well known world principal
    pub fn is_everyone(&self) -> bool {
        *self == *EVERYONE
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sid {
    fn from(id: &str) -> Sid {
        Sid::new(id)
    }
}

bitflags! {
    /// Rights vocabulary of the target access control model
    ///
    /// The named flags stand in for the native generic rights a real security descriptor writer
    /// would encode e.g. FILE_GENERIC_READ/WRITE/EXECUTE and the control rights bundle.
    pub struct AccessRights: u32 {
        /// Generic read access
        const READ = 0o1;

        /// Generic write access
        const WRITE = 0o2;

        /// Generic execute/traverse access
        const EXECUTE = 0o4;

        /// Rights every principal is always granted i.e. read attributes and synchronize
        const BASE = 0o10;

        /// Ownership control rights i.e. change permissions and take ownership, owner only
        const OWNER = 0o20;
    }
}

/// Whether an access entry grants or denies its rights
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Effect {
    /// The entry grants its rights to the matching principal
    Allow,

    /// The entry withholds its rights from the matching principal
    Deny,
}

/// A single entry of an ordered access list
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccessEntry {
    /// Principal the entry applies to
    pub sid: Sid,

    /// Allow or deny
    pub effect: Effect,

    /// Rights granted or denied
    pub rights: AccessRights,
}

/// An ordered list of access entries evaluated top to bottom, first match wins
///
/// Entry order is semantically load bearing: a deny entry for a narrower principal must precede
/// any broader allow entry that would otherwise mask it. Lists are built fresh per applied path
/// and never reused across paths.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let (owner, group) = (Sid::new("S-1-5-21-500"), Sid::new("S-1-5-21-513"));
/// let acl = sys::access_list(0o640, &owner, &group).unwrap();
/// assert_eq!(acl.to_mode(&owner, &group), 0o640);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccessList(Vec<AccessEntry>);

impl AccessList {
    /// Returns the entries in evaluation order
    pub fn entries(&self) -> &[AccessEntry] {
        &self.0
    }

    /// Returns the number of entries in the list
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the entries in evaluation order
    pub fn iter(&self) -> std::slice::Iter<'_, AccessEntry> {
        self.0.iter()
    }

    /// Returns true if the first entry matching the principal and the right allows it
    ///
    /// Evaluation stops at the first entry whose principal matches the requester and whose
    /// rights cover the requested right, exactly as the target model evaluates a descriptor.
    /// The world principal matches every requester. No matching entry means denied.
    pub fn grants(&self, sid: &Sid, right: AccessRights) -> bool {
        for entry in self.iter() {
            if (entry.sid == *sid || entry.sid.is_everyone()) && entry.rights.contains(right) {
                return entry.effect == Effect::Allow;
            }
        }
        false
    }

    /// Reconstruct the 9 bit permission mask the list encodes for the given identities
    ///
    /// This is the observable inverse of [`access_list`]: deny entries are a representation
    /// detail and only influence the outcome through first match evaluation.
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let (owner, group) = (Sid::new("S-1-5-21-500"), Sid::new("S-1-5-21-513"));
    /// let acl = sys::access_list(0o754, &owner, &group).unwrap();
    /// assert_eq!(acl.to_mode(&owner, &group), 0o754);
    /// ```
    pub fn to_mode(&self, owner: &Sid, group: &Sid) -> u32 {
        let mut mode = 0;
        for (sid, positions) in [(owner, WHO_USER), (group, WHO_GROUP), (&*EVERYONE, WHO_OTHER)] {
            for (right, bit) in
                [(AccessRights::READ, 0o4), (AccessRights::WRITE, 0o2), (AccessRights::EXECUTE, 0o1)]
            {
                if self.grants(sid, right) {
                    // Scale the rwx bit into the principal's position triplet
                    mode |= bit * (positions & 0o111);
                }
            }
        }
        mode
    }
}

impl<'a> IntoIterator for &'a AccessList {
    type IntoIter = std::slice::Iter<'a, AccessEntry>;
    type Item = &'a AccessEntry;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Derive the per principal allow and deny rights for the given 9 bit mask.
//
// The target model has no notion of scope precedence, so Unix's implicit owner > group > other
// priority is reproduced by denying a narrower principal a right whenever its bit is off while
// a broader principal's corresponding bit is on. The world principal is the broadest scope and
// never needs a deny of its own.
fn access_masks(
    mask: u32,
) -> (AccessRights, AccessRights, AccessRights, AccessRights, AccessRights) {
    let rights = [
        (AccessRights::READ, 0o4),
        (AccessRights::WRITE, 0o2),
        (AccessRights::EXECUTE, 0o1),
    ];

    let mut user_allow = AccessRights::BASE | AccessRights::OWNER;
    let mut user_deny = AccessRights::empty();
    let mut group_allow = AccessRights::BASE;
    let mut group_deny = AccessRights::empty();
    let mut other_allow = AccessRights::BASE;

    for (right, bit) in rights {
        let user = mask & (bit << 6) != 0;
        let group = mask & (bit << 3) != 0;
        let other = mask & bit != 0;

        if user {
            user_allow |= right;
        } else if group || other {
            user_deny |= right;
        }

        if group {
            group_allow |= right;
        } else if other {
            group_deny |= right;
        }

        if other {
            other_allow |= right;
        }
    }

    (user_allow, user_deny, group_allow, group_deny, other_allow)
}

/// Map a 9 bit permission mask and the owner and group identities to an ordered access list
///
/// The produced order is [owner deny] [owner allow] [group deny] [group allow] [everyone allow]
/// with empty deny halves omitted, which preserves Unix semantics under first match evaluation.
/// The owner allow entry always carries the ownership control rights on top of the mask's bits;
/// every allow entry carries the base rights all principals hold.
///
/// ### Errors
/// * AclError::AllocationFailed when reserving space for the list fails
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let (owner, group) = (Sid::new("S-1-5-21-500"), Sid::new("S-1-5-21-513"));
///
/// // 0o640 needs no deny entries
/// let acl = sys::access_list(0o640, &owner, &group).unwrap();
/// assert_eq!(acl.len(), 3);
///
/// // 0o460 must deny the owner write before allowing the group write
/// let acl = sys::access_list(0o460, &owner, &group).unwrap();
/// assert_eq!(acl.len(), 4);
/// assert_eq!(acl.to_mode(&owner, &group), 0o460);
/// ```
pub fn access_list(mask: u32, owner: &Sid, group: &Sid) -> AmResult<AccessList> {
    let (user_allow, user_deny, group_allow, group_deny, other_allow) = access_masks(mask);

    let mut entries: Vec<AccessEntry> = Vec::new();
    // Worst case is five entries; surface reservation failure rather than aborting
    entries.try_reserve(5).map_err(|_| AclError::AllocationFailed)?;

    if !user_deny.is_empty() {
        entries.push(AccessEntry { sid: owner.clone(), effect: Effect::Deny, rights: user_deny });
    }
    entries.push(AccessEntry { sid: owner.clone(), effect: Effect::Allow, rights: user_allow });
    if !group_deny.is_empty() {
        entries.push(AccessEntry { sid: group.clone(), effect: Effect::Deny, rights: group_deny });
    }
    entries.push(AccessEntry { sid: group.clone(), effect: Effect::Allow, rights: group_allow });
    entries.push(AccessEntry {
        sid: EVERYONE.clone(),
        effect: Effect::Allow,
        rights: other_allow,
    });

    Ok(AccessList(entries))
}

// Unit tests
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use crate::prelude::*;

    fn sids() -> (Sid, Sid) {
        (Sid::new("S-1-5-21-500"), Sid::new("S-1-5-21-513"))
    }

    #[test]
    fn test_sid() {
        let sid = Sid::new("S-1-5-21-500");
        assert_eq!(sid.id(), "S-1-5-21-500");
        assert_eq!(sid.to_string(), "S-1-5-21-500");
        assert_eq!(Sid::from("S-1-1-0"), *EVERYONE);
        assert!(Sid::from("S-1-1-0").is_everyone());
        assert!(!sid.is_everyone());
    }

    #[test]
    fn test_access_list_no_denies() {
        let (owner, group) = sids();
        let acl = sys::access_list(0o755, &owner, &group).unwrap();

        // Owner allow, group allow, everyone allow
        assert_eq!(acl.len(), 3);
        let entries = acl.entries();
        assert_eq!(entries[0].sid, owner);
        assert_eq!(entries[0].effect, Effect::Allow);
        assert_eq!(
            entries[0].rights,
            AccessRights::BASE | AccessRights::OWNER | AccessRights::READ | AccessRights::WRITE | AccessRights::EXECUTE
        );
        assert_eq!(entries[1].sid, group);
        assert_eq!(entries[1].rights, AccessRights::BASE | AccessRights::READ | AccessRights::EXECUTE);
        assert_eq!(entries[2].sid, *EVERYONE);
        assert_eq!(entries[2].rights, AccessRights::BASE | AccessRights::READ | AccessRights::EXECUTE);
    }

    #[test]
    fn test_access_list_owner_deny() {
        let (owner, group) = sids();

        // Owner write off while group has it
        let acl = sys::access_list(0o464, &owner, &group).unwrap();
        assert_eq!(acl.len(), 4);
        let entries = acl.entries();
        assert_eq!(entries[0].sid, owner);
        assert_eq!(entries[0].effect, Effect::Deny);
        assert_eq!(entries[0].rights, AccessRights::WRITE);
        assert_eq!(entries[1].sid, owner);
        assert_eq!(entries[1].effect, Effect::Allow);

        // Owner bit off with the broader bit only on other still denies
        let acl = sys::access_list(0o446, &owner, &group).unwrap();
        assert_eq!(acl.entries()[0].rights, AccessRights::WRITE);
        assert_eq!(acl.entries()[0].effect, Effect::Deny);
    }

    #[test]
    fn test_access_list_group_deny() {
        let (owner, group) = sids();

        // Group write off while other has it
        let acl = sys::access_list(0o646, &owner, &group).unwrap();
        assert_eq!(acl.len(), 4);
        let entries = acl.entries();
        assert_eq!(entries[0].effect, Effect::Allow);
        assert_eq!(entries[1].sid, group);
        assert_eq!(entries[1].effect, Effect::Deny);
        assert_eq!(entries[1].rights, AccessRights::WRITE);

        // Asymmetric by design: other is never denied what group has
        let acl = sys::access_list(0o664, &owner, &group).unwrap();
        assert_eq!(acl.len(), 3);
        assert!(acl.iter().all(|x| x.effect == Effect::Allow));
    }

    #[test]
    fn test_access_list_ordering_invariant() {
        let (owner, group) = sids();
        for mask in 0..=0o777 {
            let acl = sys::access_list(mask, &owner, &group).unwrap();
            let entries = acl.entries();

            // No empty rights entries ever
            assert!(entries.iter().all(|x| !x.rights.is_empty()));

            // Denies precede the allow for the same principal, owner entries precede group
            // entries and the everyone entry is last
            let owner_allow = entries.iter().position(|x| x.sid == owner && x.effect == Effect::Allow);
            let group_allow = entries.iter().position(|x| x.sid == group && x.effect == Effect::Allow);
            let everyone = entries.iter().position(|x| x.sid.is_everyone());
            assert!(owner_allow < group_allow);
            assert!(group_allow < everyone);
            assert_eq!(everyone, Some(entries.len() - 1));
            for (i, entry) in entries.iter().enumerate() {
                if entry.effect == Effect::Deny {
                    let allow = entries.iter().position(|x| x.sid == entry.sid && x.effect == Effect::Allow);
                    assert!(Some(i) < allow);
                }
            }
        }
    }

    #[test]
    fn test_access_list_round_trip() {
        let (owner, group) = sids();
        for mask in 0..=0o777 {
            let acl = sys::access_list(mask, &owner, &group).unwrap();
            assert_eq!(acl.to_mode(&owner, &group), mask, "mask {:03o}", mask);
        }
    }

    #[test]
    fn test_grants_first_match_wins() {
        let (owner, group) = sids();

        // Without the owner deny the everyone allow would leak read to the owner
        let acl = sys::access_list(0o044, &owner, &group).unwrap();
        assert!(!acl.grants(&owner, AccessRights::READ));
        assert!(acl.grants(&group, AccessRights::READ));
        assert!(acl.grants(&EVERYONE, AccessRights::READ));

        // A stranger's sid only matches the everyone entry
        let stranger = Sid::new("S-1-5-21-999");
        assert!(acl.grants(&stranger, AccessRights::READ));
        assert!(!acl.grants(&stranger, AccessRights::WRITE));

        // Base rights flow to every principal regardless of mask
        let acl = sys::access_list(0o000, &owner, &group).unwrap();
        assert!(acl.grants(&owner, AccessRights::BASE));
        assert!(acl.grants(&stranger, AccessRights::BASE));
        assert!(acl.grants(&owner, AccessRights::OWNER));
        assert!(!acl.grants(&group, AccessRights::OWNER));
    }
}

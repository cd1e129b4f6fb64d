use once_cell::sync::Lazy;

mod error;

pub use error::{IdentityError, IdentityErrorCode, IdentityResult};

/// The four principals the protection engine cares about. Everything else
/// in a volume's ACL is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownIdentity {
    Users,
    AuthenticatedUsers,
    Administrators,
    System,
}

impl WellKnownIdentity {
    pub const ALL: [Self; 4] = [
        Self::Users,
        Self::AuthenticatedUsers,
        Self::Administrators,
        Self::System,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Users => "Users",
            Self::AuthenticatedUsers => "Authenticated Users",
            Self::Administrators => "Administrators",
            Self::System => "SYSTEM",
        }
    }
}

/// Binary security identifier in the native on-wire layout, comparable by
/// byte equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityId {
    bytes: Vec<u8>,
}

impl SecurityId {
    fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Process-wide table of resolved well-known identifiers. Built once on
/// first use and read-only afterwards; a build failure is remembered and
/// returned to every caller.
pub struct IdentityCatalog {
    users: SecurityId,
    authenticated_users: SecurityId,
    administrators: SecurityId,
    system: SecurityId,
}

static CATALOG: Lazy<IdentityResult<IdentityCatalog>> = Lazy::new(IdentityCatalog::build);

impl IdentityCatalog {
    fn build() -> IdentityResult<Self> {
        Ok(Self {
            users: SecurityId::new(build_sid(WellKnownIdentity::Users)?),
            authenticated_users: SecurityId::new(build_sid(WellKnownIdentity::AuthenticatedUsers)?),
            administrators: SecurityId::new(build_sid(WellKnownIdentity::Administrators)?),
            system: SecurityId::new(build_sid(WellKnownIdentity::System)?),
        })
    }

    pub fn get() -> IdentityResult<&'static Self> {
        CATALOG.as_ref().map_err(|error| error.clone())
    }

    pub fn sid(&self, identity: WellKnownIdentity) -> &SecurityId {
        match identity {
            WellKnownIdentity::Users => &self.users,
            WellKnownIdentity::AuthenticatedUsers => &self.authenticated_users,
            WellKnownIdentity::Administrators => &self.administrators,
            WellKnownIdentity::System => &self.system,
        }
    }
}

pub fn resolve(identity: WellKnownIdentity) -> IdentityResult<&'static SecurityId> {
    IdentityCatalog::get().map(|catalog| catalog.sid(identity))
}

#[cfg(windows)]
fn build_sid(identity: WellKnownIdentity) -> IdentityResult<Vec<u8>> {
    use std::ptr;
    use windows_sys::Win32::Security::{
        CreateWellKnownSid, WinAuthenticatedUserSid, WinBuiltinAdministratorsSid,
        WinBuiltinUsersSid, WinLocalSystemSid, SECURITY_MAX_SID_SIZE,
    };

    let kind = match identity {
        WellKnownIdentity::Users => WinBuiltinUsersSid,
        WellKnownIdentity::AuthenticatedUsers => WinAuthenticatedUserSid,
        WellKnownIdentity::Administrators => WinBuiltinAdministratorsSid,
        WellKnownIdentity::System => WinLocalSystemSid,
    };
    let mut sid = vec![0u8; SECURITY_MAX_SID_SIZE as usize];
    let mut len = sid.len() as u32;
    let ok = unsafe {
        CreateWellKnownSid(kind, ptr::null_mut(), sid.as_mut_ptr() as *mut _, &mut len)
    };
    if ok == 0 {
        return Err(IdentityError::new(
            IdentityErrorCode::ResolutionFailed,
            format!(
                "CreateWellKnownSid failed for {}: {}",
                identity.display_name(),
                std::io::Error::last_os_error()
            ),
        ));
    }
    sid.truncate(len as usize);
    Ok(sid)
}

#[cfg(not(windows))]
fn build_sid(identity: WellKnownIdentity) -> IdentityResult<Vec<u8>> {
    // NT-authority SIDs in the standard binary layout: revision,
    // sub-authority count, 48-bit authority (5), then little-endian
    // sub-authorities. Matches what CreateWellKnownSid emits on Windows.
    let subauthorities: &[u32] = match identity {
        WellKnownIdentity::Users => &[32, 545],
        WellKnownIdentity::AuthenticatedUsers => &[11],
        WellKnownIdentity::Administrators => &[32, 544],
        WellKnownIdentity::System => &[18],
    };
    let mut bytes = vec![1u8, subauthorities.len() as u8, 0, 0, 0, 0, 0, 5];
    for subauthority in subauthorities {
        bytes.extend_from_slice(&subauthority.to_le_bytes());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_well_known_identities() {
        for identity in WellKnownIdentity::ALL {
            let sid = resolve(identity).expect("well-known identity must resolve");
            assert!(!sid.as_bytes().is_empty());
        }
    }

    #[test]
    fn resolved_identities_are_distinct() {
        let mut seen = Vec::new();
        for identity in WellKnownIdentity::ALL {
            let sid = resolve(identity).expect("well-known identity must resolve");
            assert!(!seen.contains(&sid), "duplicate SID for {identity:?}");
            seen.push(sid);
        }
    }

    #[test]
    fn administrators_sid_carries_expected_subauthorities() {
        let sid = resolve(WellKnownIdentity::Administrators).expect("resolve");
        let bytes = sid.as_bytes();
        // S-1-5-32-544: final sub-authority is 544 little-endian.
        assert_eq!(&bytes[bytes.len() - 4..], &544u32.to_le_bytes());
    }

    #[test]
    fn display_names_match_local_account_names() {
        assert_eq!(WellKnownIdentity::Users.display_name(), "Users");
        assert_eq!(
            WellKnownIdentity::AuthenticatedUsers.display_name(),
            "Authenticated Users"
        );
        assert_eq!(
            WellKnownIdentity::Administrators.display_name(),
            "Administrators"
        );
        assert_eq!(WellKnownIdentity::System.display_name(), "SYSTEM");
    }
}

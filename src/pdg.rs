//! Particle species lookup by PDG code.

/// Display name and charge (in units of e) of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Species {
    pub name: &'static str,
    pub charge: i32,
}

pub const ELECTRON: i32 = 11;
pub const MUON: i32 = 13;
pub const PHOTON: i32 = 22;

// (code, particle, antiparticle, particle charge)
const TABLE: &[(i32, &str, &str, i32)] = &[
    (1, "d", "d_bar", 0),
    (2, "u", "u_bar", 0),
    (3, "s", "s_bar", 0),
    (4, "c", "c_bar", 0),
    (5, "b", "b_bar", 0),
    (6, "t", "t_bar", 0),
    (11, "e-", "e+", -1),
    (12, "nu_e", "nu_e_bar", 0),
    (13, "mu-", "mu+", -1),
    (14, "nu_mu", "nu_mu_bar", 0),
    (15, "tau-", "tau+", -1),
    (16, "nu_tau", "nu_tau_bar", 0),
    (21, "g", "g", 0),
    (22, "gamma", "gamma", 0),
    (23, "Z0", "Z0", 0),
    (24, "W+", "W-", 1),
    (25, "h0", "h0", 0),
    (111, "pi0", "pi0", 0),
    (130, "K0_L", "K0_L", 0),
    (211, "pi+", "pi-", 1),
    (310, "K0_S", "K0_S", 0),
    (321, "K+", "K-", 1),
    (2112, "n", "n_bar", 0),
    (2212, "p+", "p-", 1),
    (3122, "Lambda0", "Lambda0_bar", 0),
];

/// Look up a species. Unknown codes yield `None`.
pub fn lookup(code: i32) -> Option<Species> {
    let abs = code.unsigned_abs();
    TABLE
        .iter()
        .find(|(c, ..)| c.unsigned_abs() == abs)
        .map(|&(_, particle, anti, charge)| {
            if code < 0 {
                Species { name: anti, charge: -charge }
            } else {
                Species { name: particle, charge }
            }
        })
}

/// Display name of a code, falling back to the number itself.
pub fn name_of(code: i32) -> String {
    lookup(code).map_or_else(|| format!("pdg{}", code), |s| s.name.to_string())
}

/// Lepton code for a charge: negative charge is the particle.
pub fn lepton_code(base: i32, charge: i32) -> i32 {
    if charge < 0 {
        base
    } else {
        -base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(11), Some(Species { name: "e-", charge: -1 }));
        assert_eq!(lookup(-11), Some(Species { name: "e+", charge: 1 }));
        assert_eq!(lookup(-211).map(|s| s.charge), Some(-1));
        assert_eq!(lookup(22).map(|s| s.charge), Some(0));
        assert_eq!(lookup(9_999_999), None);
        assert_eq!(name_of(9_999_999), "pdg9999999");
    }

    #[test]
    fn test_extreme_codes() {
        assert_eq!(lookup(i32::MIN), None);
        assert_eq!(name_of(i32::MIN), format!("pdg{}", i32::MIN));
        assert_eq!(lookup(i32::MAX), None);
    }

    #[test]
    fn test_lepton_code() {
        assert_eq!(lepton_code(ELECTRON, -1), 11);
        assert_eq!(lepton_code(ELECTRON, 1), -11);
        assert_eq!(lepton_code(MUON, 1), -13);
    }
}

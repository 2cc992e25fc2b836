use anyhow::{anyhow, bail, Result};

/// Formats an Ethernet address into a String.
pub(crate) fn format_eth_addr(raw: &[u8; 6]) -> Result<String> {
    let mut addr = String::with_capacity(17);

    for (i, group) in raw.iter().enumerate() {
        addr.push(
            char::from_digit((group >> 4).into(), 16).ok_or_else(|| anyhow!("invalid eth byte"))?,
        );
        addr.push(
            char::from_digit((group & 0xf).into(), 16)
                .ok_or_else(|| anyhow!("invalid eth byte"))?,
        );
        if i < 5 {
            addr.push(':');
        }
    }

    Ok(addr)
}

/// Parses an Ethernet address in its "aa:bb:cc:dd:ee:ff" form.
pub(crate) fn parse_eth_addr(addr: &str) -> Result<[u8; 6]> {
    let mut raw = [0u8; 6];
    let mut groups = addr.split(':');

    for byte in raw.iter_mut() {
        let group = groups
            .next()
            .ok_or_else(|| anyhow!("Ethernet address {addr} is too short"))?;
        if group.len() != 2 || !group.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("Invalid Ethernet address group '{group}' in {addr}");
        }
        *byte = u8::from_str_radix(group, 16)
            .map_err(|e| anyhow!("Invalid Ethernet address {addr}: {e}"))?;
    }
    if groups.next().is_some() {
        bail!("Ethernet address {addr} is too long");
    }

    Ok(raw)
}

/// Formats an IPv4 address into a String.
pub(crate) fn format_ipv4_addr(raw: u32) -> Result<String> {
    let u8_to_utf8 = |addr: &mut String, mut input: u32| -> Result<()> {
        let mut push = false;

        for ord in [100, 10, 1] {
            let current = input / ord;
            input %= ord;

            // Do not push leading 0s but always push the last number in case
            // all we got was 0s.
            if push || current != 0 || ord == 1 {
                push = true;
                addr.push(
                    char::from_digit(current, 10).ok_or_else(|| anyhow!("invalid IPv4 digit"))?,
                );
            }
        }

        Ok(())
    };

    let mut addr = String::with_capacity(15);
    u8_to_utf8(&mut addr, raw >> 24)?;
    addr.push('.');
    u8_to_utf8(&mut addr, (raw >> 16) & 0xff)?;
    addr.push('.');
    u8_to_utf8(&mut addr, (raw >> 8) & 0xff)?;
    addr.push('.');
    u8_to_utf8(&mut addr, raw & 0xff)?;

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use test_case::test_case;

    #[test]
    fn ethaddr_to_string() {
        assert!(
            &super::format_eth_addr(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff]).unwrap()
                == "ff:ff:ff:ff:ff:ff"
        );
        assert!(&super::format_eth_addr(&[0, 0, 0, 0, 0, 0]).unwrap() == "00:00:00:00:00:00");
        assert!(
            &super::format_eth_addr(&[0x0a, 0x58, 0x0a, 0xf4, 0x00, 0x01]).unwrap()
                == "0a:58:0a:f4:00:01"
        );
    }

    #[test]
    fn string_to_ethaddr() {
        assert_eq!(
            super::parse_eth_addr("0a:58:0A:f4:00:01").unwrap(),
            [0x0a, 0x58, 0x0a, 0xf4, 0x00, 0x01]
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("0a:58:0a:f4:00" ; "short")]
    #[test_case("0a:58:0a:f4:00:01:02" ; "long")]
    #[test_case("0a:58:0a:f4:00:1" ; "narrow group")]
    #[test_case("0a:58:0a:f4:00:zz" ; "not hex")]
    fn invalid_ethaddr(addr: &str) {
        assert!(super::parse_eth_addr(addr).is_err());
    }

    #[test]
    fn ipv4_to_string() {
        assert!(&super::format_ipv4_addr(0).unwrap() == "0.0.0.0");
        assert!(&super::format_ipv4_addr(0xffffffff).unwrap() == "255.255.255.255");
        assert!(
            &super::format_ipv4_addr(Ipv4Addr::new(100, 10, 1, 0).into()).unwrap()
                == "100.10.1.0"
        );
        assert!(
            &super::format_ipv4_addr(Ipv4Addr::new(127, 0, 0, 0).into()).unwrap() == "127.0.0.0"
        );
    }
}

//! AP-side sequences driven by the uplink.
//!
//! Both sequences are best-effort: a failing step is logged and reported
//! through the sink, the remaining steps still run, and nothing is rolled
//! back.  Once the AP DHCP server has been stopped it is always restarted.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::config::RouterConfig;
use crate::error::NetError;

use super::events::{AppEvent, CoordinationStep};
use super::ports::{EventSink, Interface, IpInfo, NetworkPort};

fn step(
    result: Result<(), NetError>,
    which: CoordinationStep,
    sink: &mut impl EventSink,
) {
    if let Err(e) = result {
        warn!("coordination: {:?} failed: {}", which, e);
        sink.emit(&AppEvent::CoordinationStepFailed(which));
    }
}

/// Route AP clients through the freshly acquired uplink.
///
/// 1. STA becomes the default route.
/// 2. NAPT is enabled on the AP.
/// 3. The STA's main DNS server is read.
/// 4. If one is known, the AP DHCP server is restarted offering it.
///
/// Returns the DNS server relayed to AP clients.
pub fn coordinate(net: &mut impl NetworkPort, sink: &mut impl EventSink) -> Option<Ipv4Addr> {
    step(
        net.set_default_route(Interface::Sta),
        CoordinationStep::DefaultRoute,
        sink,
    );
    step(
        net.enable_napt(Interface::Ap),
        CoordinationStep::EnableNapt,
        sink,
    );

    let dns = match net.dns_server(Interface::Sta) {
        Ok(Some(dns)) => Some(dns),
        Ok(None) => {
            warn!("coordination: uplink advertised no DNS server, AP DNS left unchanged");
            None
        }
        Err(e) => {
            warn!("coordination: reading uplink DNS failed: {}", e);
            sink.emit(&AppEvent::CoordinationStepFailed(CoordinationStep::ReadDns));
            None
        }
    };

    if let Some(dns) = dns {
        step(
            net.stop_dhcp_server(Interface::Ap),
            CoordinationStep::StopDhcpServer,
            sink,
        );
        step(
            net.set_dns_offer(Interface::Ap, true),
            CoordinationStep::DnsOffer,
            sink,
        );
        step(
            net.set_dns_server(Interface::Ap, dns),
            CoordinationStep::SetDns,
            sink,
        );
        // Restart even when the stop reported an error.
        step(
            net.start_dhcp_server(Interface::Ap),
            CoordinationStep::StartDhcpServer,
            sink,
        );
        info!("coordination: AP clients now resolve via {}", dns);
    }

    sink.emit(&AppEvent::CoordinationComplete { dns });
    dns
}

/// Give the AP its static address and restart its DHCP server.
pub fn configure_ap_addressing(
    net: &mut impl NetworkPort,
    config: &RouterConfig,
    sink: &mut impl EventSink,
) {
    let ip = config.ap_ip();
    let info = IpInfo {
        ip,
        netmask: config.ap_netmask(),
        gateway: ip,
    };

    step(
        net.stop_dhcp_server(Interface::Ap),
        CoordinationStep::StopDhcpServer,
        sink,
    );
    step(
        net.set_ip_info(Interface::Ap, &info),
        CoordinationStep::SetApAddress,
        sink,
    );
    step(
        net.start_dhcp_server(Interface::Ap),
        CoordinationStep::StartDhcpServer,
        sink,
    );
    info!("AP address {} / {}", info.ip, info.netmask);
}

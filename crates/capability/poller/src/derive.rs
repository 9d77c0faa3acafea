//! 派生指标：当前报文的纯函数，不依赖任何历史状态。

use domain::RawReport;
use domain::report::fields;

/// 就地富化报文。
///
/// - `DERIVED_WATTS = round(标称功率 × 负载百分比 / 100)`，仅在标称功率可解析时写入
/// - `HEADROOM_PCT = max(0, 100 − 负载百分比)`
/// - `RUNTIME_MINUTES`：TIMELEFT 的前导数值 token，无法解析则不写入
pub fn enrich(report: &mut RawReport) {
    let loadpct = report.numeric(fields::LOADPCT).unwrap_or(0.0);
    if let Some(nompower) = report.numeric(fields::NOMPOWER)
        && nompower != 0.0
        && loadpct >= 0.0
    {
        let watts = nompower * loadpct / 100.0;
        report.set(fields::DERIVED_WATTS, format!("{:.0}", watts));
        report.set(
            fields::HEADROOM_PCT,
            format!("{:.0}", (100.0 - loadpct).max(0.0)),
        );
    }
    if let Some(runtime) = report.numeric(fields::TIMELEFT) {
        report.set(fields::RUNTIME_MINUTES, format!("{:.1}", runtime));
    }
}

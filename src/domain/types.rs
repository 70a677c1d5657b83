// ==========================================
// 周度 Flash 预测台账 - 领域类型定义
// ==========================================
// 职责: 财务口径 / 区域 枚举
// 存储格式: 与表单选项文本一致 ("Revenue" / "EBITDA", "USA" ...)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 财务口径 (Financial Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FinancialType {
    Revenue, // 收入
    #[serde(rename = "EBITDA")]
    Ebitda, // 息税折旧摊销前利润
}

impl FinancialType {
    /// 全部口径（表单下拉顺序）
    pub const ALL: [FinancialType; 2] = [FinancialType::Revenue, FinancialType::Ebitda];

    /// 数据库/导出使用的文本
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancialType::Revenue => "Revenue",
            FinancialType::Ebitda => "EBITDA",
        }
    }
}

impl fmt::Display for FinancialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FinancialType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REVENUE" => Ok(FinancialType::Revenue),
            "EBITDA" => Ok(FinancialType::Ebitda),
            other => Err(format!("未知财务口径: {}", other)),
        }
    }
}

// ==========================================
// 区域 (Region)
// ==========================================
// 固定 6 个区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "USA")]
    Usa,
    Canada,
    Europe,
    India,
    Australia,
    Africa,
}

impl Region {
    /// 全部区域（表单下拉顺序）
    pub const ALL: [Region; 6] = [
        Region::Usa,
        Region::Canada,
        Region::Europe,
        Region::India,
        Region::Australia,
        Region::Africa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Usa => "USA",
            Region::Canada => "Canada",
            Region::Europe => "Europe",
            Region::India => "India",
            Region::Australia => "Australia",
            Region::Africa => "Africa",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_uppercase();
        Region::ALL
            .iter()
            .copied()
            .find(|r| r.as_str().to_uppercase() == key)
            .ok_or_else(|| format!("未知区域: {}", s.trim()))
    }
}

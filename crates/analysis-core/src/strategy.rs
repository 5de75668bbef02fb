use serde::{Deserialize, Serialize};

/// Named analysis tasks, each with an English and a localized display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStrategy {
    PrepareData,
    Fundamentals,
    RiskManagement,
    PortfolioManagement,
    Sentiment,
    WarrenBuffett,
    StanleyDruckenmiller,
    PhilFisher,
    CharlieMunger,
    CathieWood,
    BillAckman,
    BenGraham,
    TechnicalAnalyst,
}

impl InvestmentStrategy {
    pub fn english(&self) -> &'static str {
        match self {
            InvestmentStrategy::PrepareData => "Prepare Data",
            InvestmentStrategy::Fundamentals => "Fundamentals",
            InvestmentStrategy::RiskManagement => "Risk Management",
            InvestmentStrategy::PortfolioManagement => "Portfolio Management",
            InvestmentStrategy::Sentiment => "Sentiment",
            InvestmentStrategy::WarrenBuffett => "Warren Buffett",
            InvestmentStrategy::StanleyDruckenmiller => "Stanley Druckenmiller",
            InvestmentStrategy::PhilFisher => "Phil Fisher",
            InvestmentStrategy::CharlieMunger => "Charlie Munger",
            InvestmentStrategy::CathieWood => "Cathie Wood",
            InvestmentStrategy::BillAckman => "Bill Ackman",
            InvestmentStrategy::BenGraham => "Ben Graham",
            InvestmentStrategy::TechnicalAnalyst => "Technical Analyst",
        }
    }

    pub fn localized(&self) -> &'static str {
        match self {
            InvestmentStrategy::PrepareData => "数据准备",
            InvestmentStrategy::Fundamentals => "基本面策略",
            InvestmentStrategy::RiskManagement => "风险管理策略",
            InvestmentStrategy::PortfolioManagement => "投资组合管理",
            InvestmentStrategy::Sentiment => "情绪策略",
            InvestmentStrategy::WarrenBuffett => "巴菲特策略",
            InvestmentStrategy::StanleyDruckenmiller => "德鲁肯米勒策略",
            InvestmentStrategy::PhilFisher => "菲尔·费舍尔策略",
            InvestmentStrategy::CharlieMunger => "查理·芒格策略",
            InvestmentStrategy::CathieWood => "凯茜·伍德策略",
            InvestmentStrategy::BillAckman => "比尔·阿克曼策略",
            InvestmentStrategy::BenGraham => "本·格雷厄姆策略",
            InvestmentStrategy::TechnicalAnalyst => "技术分析",
        }
    }

    /// Key used in the per-ticker response map
    pub fn key(&self) -> &'static str {
        match self {
            InvestmentStrategy::PrepareData => "prepare_data",
            InvestmentStrategy::Fundamentals => "fundamentals",
            InvestmentStrategy::RiskManagement => "risk_management",
            InvestmentStrategy::PortfolioManagement => "portfolio_management",
            InvestmentStrategy::Sentiment => "sentiment",
            InvestmentStrategy::WarrenBuffett => "warren_buffett",
            InvestmentStrategy::StanleyDruckenmiller => "stanley_druckenmiller",
            InvestmentStrategy::PhilFisher => "phil_fisher",
            InvestmentStrategy::CharlieMunger => "charlie_munger",
            InvestmentStrategy::CathieWood => "cathie_wood",
            InvestmentStrategy::BillAckman => "bill_ackman",
            InvestmentStrategy::BenGraham => "ben_graham",
            InvestmentStrategy::TechnicalAnalyst => "technical_analyst",
        }
    }
}

/// Lifecycle state of a reported task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Working,
    Done,
    Error,
}

impl TaskStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "-",
            TaskStatus::Working => "⋯",
            TaskStatus::Done => "✓",
            TaskStatus::Error => "✗",
        }
    }
}

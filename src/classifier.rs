/// Risk level reported by the provider's 1-5 air quality index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

impl RiskLevel {
    /// Total over every integer; anything outside 1-5 is `Unknown`.
    pub fn from_index(aqi: i64) -> Self {
        match aqi {
            1 => RiskLevel::Good,
            2 => RiskLevel::Fair,
            3 => RiskLevel::Moderate,
            4 => RiskLevel::Poor,
            5 => RiskLevel::VeryPoor,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Good => "Bom",
            RiskLevel::Fair => "Razoável",
            RiskLevel::Moderate => "Moderado",
            RiskLevel::Poor => "Ruim",
            RiskLevel::VeryPoor => "Muito Ruim",
            RiskLevel::Unknown => "Desconhecido",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            RiskLevel::Good => "Qualidade do ar excelente. Ótimo para atividades ao ar livre.",
            RiskLevel::Fair => {
                "Qualidade do ar aceitável. Pessoas muito sensíveis podem sentir algum desconforto."
            }
            RiskLevel::Moderate => {
                "Membros de grupos sensíveis podem ter efeitos na saúde. Limite a exposição prolongada."
            }
            RiskLevel::Poor => {
                "Qualquer pessoa pode começar a sentir efeitos na saúde. Reduza atividades ao ar livre."
            }
            RiskLevel::VeryPoor => "Alerta de saúde. Evite qualquer esforço ao ar livre.",
            RiskLevel::Unknown => "Índice AQI inválido ou indisponível.",
        }
    }
}

/// A classified reading, as handed to the notifier and the alert response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub aqi: i64,
    pub risk: RiskLevel,
}

impl Classification {
    pub fn new(aqi: i64) -> Self {
        Self {
            aqi,
            risk: RiskLevel::from_index(aqi),
        }
    }

    pub fn label(&self) -> &'static str {
        self.risk.label()
    }

    pub fn recommendation(&self) -> &'static str {
        self.risk.recommendation()
    }
}

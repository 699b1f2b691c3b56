//! Catálogo imutável de erros do pool.
use core::fmt;

use serde::Serialize;

/// Código de erro do pool.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum AmmErrorCode {
    /// Parâmetro de montante (ou reserva) igual a zero.
    ZeroAmount,
    /// Chamada depois do prazo informado.
    DeadlineExpired,
    /// Limite de slippage do chamador violado.
    SlippageExceeded,
    /// Depósito de bootstrap abaixo da liquidez mínima.
    LiquidityTooLow,
    /// Saída pedida maior ou igual à reserva de saída.
    InsufficientReserve,
    /// O ledger de tokens recusou uma transferência.
    TransferFailed,
    /// Truncamento faria k diminuir.
    InputTooSmall,
    /// Overflow ou underflow em cálculos numéricos.
    Overflow,
    /// Chamador não possui shares suficientes.
    InsufficientShares,
    /// Ativo não negociado pelo pool.
    UnsupportedPair,
    /// Registro já tem pool para o ativo.
    PoolAlreadyExists,
    /// Parâmetros de configuração inválidos.
    InvalidConfig,
    /// A própria conta do pool como chamador.
    PoolSelfCall,
}

impl AmmErrorCode {
    /// Código textual estável do erro.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "AMM-0001",
            Self::DeadlineExpired => "AMM-0002",
            Self::SlippageExceeded => "AMM-0003",
            Self::LiquidityTooLow => "AMM-0004",
            Self::InsufficientReserve => "AMM-0005",
            Self::TransferFailed => "AMM-0006",
            Self::InputTooSmall => "AMM-0007",
            Self::Overflow => "AMM-0008",
            Self::InsufficientShares => "AMM-0009",
            Self::UnsupportedPair => "AMM-0010",
            Self::PoolAlreadyExists => "AMM-0011",
            Self::InvalidConfig => "AMM-0012",
            Self::PoolSelfCall => "AMM-0013",
        }
    }

    /// Título curto em português.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "Quantidade zerada",
            Self::DeadlineExpired => "Prazo expirado",
            Self::SlippageExceeded => "Slippage excedido",
            Self::LiquidityTooLow => "Liquidez insuficiente",
            Self::InsufficientReserve => "Reserva insuficiente",
            Self::TransferFailed => "Transferência falhou",
            Self::InputTooSmall => "Input pequeno demais",
            Self::Overflow => "Overflow numérico",
            Self::InsufficientShares => "Shares insuficientes",
            Self::UnsupportedPair => "Par não suportado",
            Self::PoolAlreadyExists => "Pool já existe",
            Self::InvalidConfig => "Configuração inválida",
            Self::PoolSelfCall => "Chamador inválido",
        }
    }

    /// Mensagem base em português. `{chave}` é trocado pelo contexto do erro.
    pub const fn message_pt(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "amount deve ser > 0",
            Self::DeadlineExpired => "prazo {deadline} expirou (agora {now})",
            Self::SlippageExceeded => "{bound} violado: calculado {computed}, limite {limit}",
            Self::LiquidityTooLow => "depósito inicial {amount} abaixo do mínimo {minimum}",
            Self::InsufficientReserve => "saída {output} exige reserva maior que {reserve}",
            Self::TransferFailed => "transferência de {token} falhou: {reason}",
            Self::InputTooSmall => "input truncado reduziria k",
            Self::Overflow => "overflow/underflow numérico",
            Self::InsufficientShares => "saldo de shares {balance} menor que {requested}",
            Self::UnsupportedPair => "par {input}/{output} não é negociado por este pool",
            Self::PoolAlreadyExists => "já existe pool para {asset}",
            Self::InvalidConfig => "configuração inválida: {detail}",
            Self::PoolSelfCall => "a conta {caller} do pool não pode operar contra ele mesmo",
        }
    }

    /// Retorna todas as variantes em ordem estável.
    pub fn all() -> &'static [AmmErrorCode] {
        const ALL: &[AmmErrorCode] = &[
            AmmErrorCode::ZeroAmount,
            AmmErrorCode::DeadlineExpired,
            AmmErrorCode::SlippageExceeded,
            AmmErrorCode::LiquidityTooLow,
            AmmErrorCode::InsufficientReserve,
            AmmErrorCode::TransferFailed,
            AmmErrorCode::InputTooSmall,
            AmmErrorCode::Overflow,
            AmmErrorCode::InsufficientShares,
            AmmErrorCode::UnsupportedPair,
            AmmErrorCode::PoolAlreadyExists,
            AmmErrorCode::InvalidConfig,
            AmmErrorCode::PoolSelfCall,
        ];
        ALL
    }
}

impl fmt::Display for AmmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Mensagem padrão na localidade ativa (pt-BR).
pub fn default_locale_message(code: AmmErrorCode) -> &'static str {
    code.message_pt()
}
